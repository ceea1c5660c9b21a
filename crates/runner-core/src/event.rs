// Event payload shapes published by the orchestrator
//
// These are the `data` payloads for each lifecycle event type; the bus
// itself (subscribe/publish/unsubscribe) lives in runner-worker, since it
// needs the async runtime and channel types that crate already depends on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::model::RunStatus;

/// The well-known event type discriminants, matching the `type` field on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    RunStarted,
    StepStarted,
    StepSucceeded,
    StepFailed,
    RunFinished,
    RunState,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::RunStarted => "run_started",
            EventType::StepStarted => "step_started",
            EventType::StepSucceeded => "step_succeeded",
            EventType::StepFailed => "step_failed",
            EventType::RunFinished => "run_finished",
            EventType::RunState => "run_state",
        }
    }

    /// The synthetic event type used to replay a step row of the given
    /// status (`step_succeeded`, `step_failed`, or `step_queued`/`step_running`
    /// for in-doubt steps).
    pub fn for_step_status(status: &str) -> String {
        format!("step_{status}")
    }
}

/// A published event, ready to be serialized onto the wire as
/// `event: <type>\ndata: <json>\n\n`.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn run_started(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self::new(
            EventType::RunStarted.as_str(),
            serde_json::json!({ "run_id": run_id, "started_at": started_at }),
        )
    }

    pub fn step_started(step_id: Uuid, node_id: &str, node_type: &str) -> Self {
        Self::new(
            EventType::StepStarted.as_str(),
            serde_json::json!({
                "step_id": step_id,
                "node_id": node_id,
                "node_type": node_type,
            }),
        )
    }

    pub fn step_succeeded(step_id: Uuid, node_id: &str, output: &Value) -> Self {
        Self::new(
            EventType::StepSucceeded.as_str(),
            serde_json::json!({
                "step_id": step_id,
                "node_id": node_id,
                "output": output,
            }),
        )
    }

    pub fn step_failed(step_id: Uuid, node_id: &str, error: &str) -> Self {
        Self::new(
            EventType::StepFailed.as_str(),
            serde_json::json!({
                "step_id": step_id,
                "node_id": node_id,
                "error": error,
            }),
        )
    }

    pub fn run_finished(
        run_id: Uuid,
        status: RunStatus,
        error: Option<&str>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            EventType::RunFinished.as_str(),
            serde_json::json!({
                "run_id": run_id,
                "status": status,
                "error": error,
                "finished_at": finished_at,
            }),
        )
    }

    pub fn run_state(data: Value) -> Self {
        Self::new(EventType::RunState.as_str(), data)
    }

    /// Format as an SSE frame: `event: <type>\ndata: <json>\n\n`.
    pub fn to_sse_frame(&self) -> String {
        let data = serde_json::to_string(&self.data).unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.event_type, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_frame_has_expected_shape() {
        let event = Event::run_started(Uuid::nil(), Utc::now());
        let frame = event.to_sse_frame();
        assert!(frame.starts_with("event: run_started\ndata: "));
        assert!(frame.ends_with("\n\n"));
    }
}
