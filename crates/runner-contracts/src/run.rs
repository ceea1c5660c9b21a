// Public resource DTOs for the run intake/status/events API

use chrono::{DateTime, Utc};
use runner_core::{RunStatus, StepStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Request body for `POST /runs`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRunRequest {
    pub workflow_id: Uuid,
}

/// A workflow run, as returned by the intake and status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Run {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub org_id: Option<Uuid>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub triggered_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A single node execution within a run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepRun {
    pub id: Uuid,
    pub run_id: Uuid,
    pub node_id: String,
    pub status: StepStatus,
    pub input_json: Option<Value>,
    pub output_json: Option<Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Query parameters accepted by `GET /runs`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListRunsQuery {
    pub workflow_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}
