// Repository abstraction over the run/step-run durable state.
//
// `Database` is the only production implementation (Postgres, via sqlx);
// `testing::InMemoryRepository` gives the orchestrator (and anything else
// that only needs idempotent bookkeeping, not real persistence) something
// to run against without a live database, mirroring the split between
// `durable::persistence::postgres` and `durable::persistence::memory` in
// the teacher's durable-workflow crate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::models::{RunRow, StepRunRow, UpdateRunStatus, UpdateStep};

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn create_run(
        &self,
        workflow_id: Uuid,
        org_id: Option<Uuid>,
        triggered_by: Option<Uuid>,
    ) -> StorageResult<RunRow>;

    async fn get_run(&self, id: Uuid) -> StorageResult<RunRow>;

    async fn list_runs(&self, workflow_id: Option<Uuid>, limit: i64) -> StorageResult<Vec<RunRow>>;

    async fn update_run_status(&self, id: Uuid, fields: UpdateRunStatus) -> StorageResult<RunRow>;

    async fn get_step(&self, run_id: Uuid, step_id: Uuid) -> StorageResult<StepRunRow>;

    async fn list_steps(&self, run_id: Uuid) -> StorageResult<Vec<StepRunRow>>;

    async fn upsert_step(
        &self,
        run_id: Uuid,
        org_id: Option<Uuid>,
        node_id: &str,
    ) -> StorageResult<StepRunRow>;

    async fn update_step(&self, id: Uuid, fields: UpdateStep) -> StorageResult<StepRunRow>;
}

#[async_trait]
impl RunRepository for crate::repositories::Database {
    async fn create_run(
        &self,
        workflow_id: Uuid,
        org_id: Option<Uuid>,
        triggered_by: Option<Uuid>,
    ) -> StorageResult<RunRow> {
        crate::repositories::Database::create_run(self, workflow_id, org_id, triggered_by).await
    }

    async fn get_run(&self, id: Uuid) -> StorageResult<RunRow> {
        crate::repositories::Database::get_run(self, id).await
    }

    async fn list_runs(&self, workflow_id: Option<Uuid>, limit: i64) -> StorageResult<Vec<RunRow>> {
        crate::repositories::Database::list_runs(self, workflow_id, limit).await
    }

    async fn update_run_status(&self, id: Uuid, fields: UpdateRunStatus) -> StorageResult<RunRow> {
        crate::repositories::Database::update_run_status(self, id, fields).await
    }

    async fn get_step(&self, run_id: Uuid, step_id: Uuid) -> StorageResult<StepRunRow> {
        crate::repositories::Database::get_step(self, run_id, step_id).await
    }

    async fn list_steps(&self, run_id: Uuid) -> StorageResult<Vec<StepRunRow>> {
        crate::repositories::Database::list_steps(self, run_id).await
    }

    async fn upsert_step(
        &self,
        run_id: Uuid,
        org_id: Option<Uuid>,
        node_id: &str,
    ) -> StorageResult<StepRunRow> {
        crate::repositories::Database::upsert_step(self, run_id, org_id, node_id).await
    }

    async fn update_step(&self, id: Uuid, fields: UpdateStep) -> StorageResult<StepRunRow> {
        crate::repositories::Database::update_step(self, id, fields).await
    }
}
