// Database row types. These mirror the public DTOs in
// runner-contracts field-for-field, but stay separate so storage can evolve
// its column layout without touching the wire shape.

use chrono::{DateTime, Utc};
use runner_core::{RunStatus, StepStatus};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub org_id: Option<Uuid>,
    pub status: String,
    pub error: Option<String>,
    pub triggered_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRow {
    pub fn status(&self) -> RunStatus {
        self.status.parse().unwrap_or(RunStatus::Pending)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StepRunRow {
    pub id: Uuid,
    pub run_id: Uuid,
    pub org_id: Option<Uuid>,
    pub node_id: String,
    pub status: String,
    pub input_json: Option<Value>,
    pub output_json: Option<Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRunRow {
    pub fn status(&self) -> StepStatus {
        self.status.parse().unwrap_or(StepStatus::Queued)
    }
}

/// Fields accepted by `update_run_status`; `None` leaves the column
/// unchanged (`COALESCE`-style partial update).
#[derive(Debug, Clone, Default)]
pub struct UpdateRunStatus {
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Fields accepted by `update_step`.
#[derive(Debug, Clone, Default)]
pub struct UpdateStep {
    pub status: Option<String>,
    pub input_json: Option<Value>,
    pub output_json: Option<Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_row_status_parses_known_values() {
        let row = RunRow {
            id: Uuid::nil(),
            workflow_id: Uuid::nil(),
            org_id: None,
            status: "running".to_string(),
            error: None,
            triggered_by: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        assert_eq!(row.status(), RunStatus::Running);
    }

    #[test]
    fn step_row_status_falls_back_to_queued_on_garbage() {
        let row = StepRunRow {
            id: Uuid::nil(),
            run_id: Uuid::nil(),
            org_id: None,
            node_id: "n1".to_string(),
            status: "not-a-real-status".to_string(),
            input_json: None,
            output_json: None,
            error: None,
            started_at: None,
            finished_at: None,
        };
        assert_eq!(row.status(), StepStatus::Queued);
    }
}
