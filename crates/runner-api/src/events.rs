// Live event stream endpoint: replay-then-tail delivery of
// run/step lifecycle events over a long-lived SSE response.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use runner_core::{Event, EventType};
use runner_worker::{EventBus, SubscriptionHandle};
use runner_storage::StepRunRow;
use uuid::Uuid;

use crate::dto::run_dto;
use crate::error::ApiError;
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/runs/{id}/events", get(stream_run_events))
        .with_state(state)
}

/// GET /runs/{id}/events. Subscribes before reading history so nothing
/// published mid-replay is lost, then forwards live events until
/// `run_finished`, at which point the connection closes.
#[utoipa::path(
    get,
    path = "/runs/{id}/events",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 404, description = "Run not found"),
    ),
    tag = "runs"
)]
pub async fn stream_run_events(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    // 1. Validate the run exists before doing anything else.
    state.db.get_run(run_id).await?;

    // 2. Subscribe first so a concurrent publish can't land in the gap
    // between replay and tail.
    let (handle, mut rx) = state.bus.subscribe(run_id).await;
    let bus = state.bus.clone();

    // 3 + 4. Snapshot the run and replay step history, re-read after
    // subscribing so the snapshot reflects the same or a later state.
    let run_row = state.db.get_run(run_id).await?;
    let snapshot = serde_json::to_value(run_dto(run_row)).unwrap_or(serde_json::Value::Null);
    let steps = state.db.list_steps(run_id).await?;

    let mut replay = Vec::with_capacity(steps.len() + 1);
    replay.push(Event::run_state(snapshot));
    replay.extend(steps.iter().map(replay_event));

    let stream = async_stream::stream! {
        let _guard = UnsubscribeGuard::new(bus, handle);

        for event in replay {
            yield Ok::<SseEvent, Infallible>(to_sse_event(&event));
        }

        while let Some(event) = rx.recv().await {
            let is_finished = event.event_type == EventType::RunFinished.as_str();
            yield Ok(to_sse_event(&event));
            if is_finished {
                break;
            }
        }
    };

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("keepalive"),
    );

    let mut response = sse.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

fn to_sse_event(event: &Event) -> SseEvent {
    let data = serde_json::to_string(&event.data).unwrap_or_else(|_| "{}".to_string());
    SseEvent::default()
        .event(event.event_type.as_str())
        .data(data)
}

/// Synthesize a `step_{status}` replay event from a persisted step row, so a
/// late subscriber sees the same history a live one would have observed.
fn replay_event(step: &StepRunRow) -> Event {
    let status = step.status().to_string();
    let event_type = EventType::for_step_status(&status);
    let data = serde_json::json!({
        "step_id": step.id,
        "node_id": step.node_id,
        "status": status,
        "output": step.output_json,
        "error": step.error,
    });
    Event::new(event_type, data)
}

/// Unsubscribes on drop, covering both the `run_finished` exit and client
/// disconnect (the stream future is simply dropped without running the rest
/// of its body).
struct UnsubscribeGuard {
    bus: EventBus,
    handle: Option<SubscriptionHandle>,
}

impl UnsubscribeGuard {
    fn new(bus: EventBus, handle: SubscriptionHandle) -> Self {
        Self {
            bus,
            handle: Some(handle),
        }
    }
}

impl Drop for UnsubscribeGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let bus = self.bus.clone();
            tokio::spawn(async move {
                bus.unsubscribe(handle).await;
            });
        }
    }
}
