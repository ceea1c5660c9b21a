// Run intake and lookup HTTP routes.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use runner_contracts::{CreateRunRequest, ListRunsQuery, Run, StepRun};
use uuid::Uuid;

use crate::auth::{self, require_role};
use crate::dto::{run_dto, step_dto};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/runs", post(create_run).get(list_runs))
        .route("/runs/{id}", get(get_run))
        .route("/runs/{id}/cancel", patch(cancel_run))
        .route("/runs/{id}/steps", get(list_steps))
        .route("/runs/{id}/steps/{step_id}", get(get_step))
        .with_state(state)
}

/// POST /runs — authorize by role, persist a pending run
/// stamped with the caller's org, and submit it to the worker pool.
#[utoipa::path(
    post,
    path = "/runs",
    request_body = CreateRunRequest,
    responses(
        (status = 201, description = "Run created and submitted", body = Run),
        (status = 403, description = "Missing or unrecognized X-User-Role header"),
    ),
    tag = "runs"
)]
pub async fn create_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<Run>), ApiError> {
    require_role(&headers)?;
    let org_id = auth::org_id(&headers);
    let triggered_by = auth::user_id(&headers);

    let row = state
        .db
        .create_run(req.workflow_id, org_id, triggered_by)
        .await?;

    state.runner.start_workflow(row.id).await?;
    tracing::info!(run_id = %row.id, workflow_id = %req.workflow_id, "run submitted");

    Ok((StatusCode::CREATED, Json(run_dto(row))))
}

/// GET /runs/{id}
#[utoipa::path(
    get,
    path = "/runs/{id}",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run found", body = Run),
        (status = 404, description = "Run not found"),
    ),
    tag = "runs"
)]
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, ApiError> {
    let row = state.db.get_run(id).await?;
    Ok(Json(run_dto(row)))
}

/// GET /runs?workflow_id=&limit=
#[utoipa::path(
    get,
    path = "/runs",
    params(
        ("workflow_id" = Option<Uuid>, Query, description = "Filter by workflow id"),
        ("limit" = Option<i64>, Query, description = "Max rows, newest first (default 50)"),
    ),
    responses((status = 200, description = "Runs ordered by created_at desc", body = Vec<Run>)),
    tag = "runs"
)]
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<ListRunsQuery>,
) -> Result<Json<Vec<Run>>, ApiError> {
    let rows = state
        .db
        .list_runs(params.workflow_id, params.limit)
        .await?;
    Ok(Json(rows.into_iter().map(run_dto).collect()))
}

/// PATCH /runs/{id}/cancel — optional, best-effort cancellation signal;
/// the worker observes the flag at the next node boundary.
#[utoipa::path(
    patch,
    path = "/runs/{id}/cancel",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Cancellation signalled", body = Run),
        (status = 404, description = "Run not found"),
    ),
    tag = "runs"
)]
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, ApiError> {
    let row = state.db.get_run(id).await?;
    state.runner.cancel_workflow(id).await?;
    tracing::info!(run_id = %id, "cancellation signalled");
    Ok(Json(run_dto(row)))
}

/// GET /runs/{id}/steps
#[utoipa::path(
    get,
    path = "/runs/{id}/steps",
    params(("id" = Uuid, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Steps ordered by started_at, nulls last", body = Vec<StepRun>),
        (status = 404, description = "Run not found"),
    ),
    tag = "runs"
)]
pub async fn list_steps(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StepRun>>, ApiError> {
    // 404 if the run itself doesn't exist, per the external interface table.
    state.db.get_run(id).await?;
    let rows = state.db.list_steps(id).await?;
    Ok(Json(rows.into_iter().map(step_dto).collect()))
}

/// GET /runs/{id}/steps/{step_id}
#[utoipa::path(
    get,
    path = "/runs/{id}/steps/{step_id}",
    params(
        ("id" = Uuid, Path, description = "Run ID"),
        ("step_id" = Uuid, Path, description = "Step ID"),
    ),
    responses(
        (status = 200, description = "Step found", body = StepRun),
        (status = 404, description = "Run or step not found"),
    ),
    tag = "runs"
)]
pub async fn get_step(
    State(state): State<AppState>,
    Path((run_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<StepRun>, ApiError> {
    let row = state.db.get_step(run_id, step_id).await?;
    Ok(Json(step_dto(row)))
}
