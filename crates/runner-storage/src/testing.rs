// In-memory `RunRepository` for testing the orchestrator without a live
// Postgres instance. Mirrors the teacher's
// `durable::persistence::memory::InMemoryWorkflowEventStore`: same method
// set as the production store, same error semantics, no I/O.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::models::{RunRow, StepRunRow, UpdateRunStatus, UpdateStep};
use crate::traits::RunRepository;

#[derive(Default)]
struct State {
    runs: Vec<RunRow>,
    steps: Vec<StepRunRow>,
}

/// In-memory implementation of `RunRepository`, primarily for testing the
/// orchestrator. Provides the same semantics as `Database`, including the
/// `(run_id, node_id)` uniqueness `upsert_step` relies on.
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Seed a run directly (bypassing `create_run`'s fresh-id generation),
    /// useful for resume tests that need a known run id up front.
    pub fn seed_run(&self, row: RunRow) {
        self.state.lock().unwrap().runs.push(row);
    }

    /// Seed a step directly, for resume-from-persistence tests.
    pub fn seed_step(&self, row: StepRunRow) {
        self.state.lock().unwrap().steps.push(row);
    }
}

#[async_trait]
impl RunRepository for InMemoryRepository {
    async fn create_run(
        &self,
        workflow_id: Uuid,
        org_id: Option<Uuid>,
        triggered_by: Option<Uuid>,
    ) -> StorageResult<RunRow> {
        let row = RunRow {
            id: Uuid::now_v7(),
            workflow_id,
            org_id,
            status: "pending".to_string(),
            error: None,
            triggered_by,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        let mut state = self.state.lock().unwrap();
        state.runs.push(row.clone());
        Ok(row)
    }

    async fn get_run(&self, id: Uuid) -> StorageResult<RunRow> {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StorageError::RunNotFound(id))
    }

    async fn list_runs(&self, workflow_id: Option<Uuid>, limit: i64) -> StorageResult<Vec<RunRow>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<RunRow> = state
            .runs
            .iter()
            .filter(|r| workflow_id.map_or(true, |w| r.workflow_id == w))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn update_run_status(&self, id: Uuid, fields: UpdateRunStatus) -> StorageResult<RunRow> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::RunNotFound(id))?;
        row.status = fields.status;
        if fields.started_at.is_some() {
            row.started_at = fields.started_at;
        }
        if fields.finished_at.is_some() {
            row.finished_at = fields.finished_at;
        }
        if fields.error.is_some() {
            row.error = fields.error;
        }
        Ok(row.clone())
    }

    async fn get_step(&self, run_id: Uuid, step_id: Uuid) -> StorageResult<StepRunRow> {
        self.state
            .lock()
            .unwrap()
            .steps
            .iter()
            .find(|s| s.run_id == run_id && s.id == step_id)
            .cloned()
            .ok_or(StorageError::StepNotFound(step_id))
    }

    async fn list_steps(&self, run_id: Uuid) -> StorageResult<Vec<StepRunRow>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<StepRunRow> = state
            .steps
            .iter()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| match (a.started_at, b.started_at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(rows)
    }

    async fn upsert_step(
        &self,
        run_id: Uuid,
        org_id: Option<Uuid>,
        node_id: &str,
    ) -> StorageResult<StepRunRow> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .steps
            .iter()
            .find(|s| s.run_id == run_id && s.node_id == node_id)
        {
            return Ok(existing.clone());
        }
        let row = StepRunRow {
            id: Uuid::now_v7(),
            run_id,
            org_id,
            node_id: node_id.to_string(),
            status: "queued".to_string(),
            input_json: None,
            output_json: None,
            error: None,
            started_at: None,
            finished_at: None,
        };
        state.steps.push(row.clone());
        Ok(row)
    }

    async fn update_step(&self, id: Uuid, fields: UpdateStep) -> StorageResult<StepRunRow> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StorageError::StepNotFound(id))?;
        if let Some(status) = fields.status {
            row.status = status;
        }
        if fields.input_json.is_some() {
            row.input_json = fields.input_json;
        }
        if fields.output_json.is_some() {
            row.output_json = fields.output_json;
        }
        if fields.error.is_some() {
            row.error = fields.error;
        }
        if fields.started_at.is_some() {
            row.started_at = fields.started_at;
        }
        if fields.finished_at.is_some() {
            row.finished_at = fields.finished_at;
        }
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_step_is_idempotent() {
        let repo = InMemoryRepository::new();
        let run = repo.create_run(Uuid::now_v7(), None, None).await.unwrap();

        let first = repo.upsert_step(run.id, None, "a").await.unwrap();
        let second = repo.upsert_step(run.id, None, "a").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(repo.list_steps(run.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_run_reports_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_run(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, StorageError::RunNotFound(_)));
    }
}
