// Repository layer for the run/step-run durable state.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::models::{RunRow, StepRunRow, UpdateRunStatus, UpdateStep};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_url(database_url: &str) -> StorageResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Database(sqlx::Error::Migrate(Box::new(e))))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Runs
    // ============================================

    pub async fn create_run(
        &self,
        workflow_id: Uuid,
        org_id: Option<Uuid>,
        triggered_by: Option<Uuid>,
    ) -> StorageResult<RunRow> {
        let id = Uuid::now_v7();
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            INSERT INTO runs (id, workflow_id, org_id, status, triggered_by)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING id, workflow_id, org_id, status, error,
                      triggered_by, created_at, started_at, finished_at
            "#,
        )
        .bind(id)
        .bind(workflow_id)
        .bind(org_id)
        .bind(triggered_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_run(&self, id: Uuid) -> StorageResult<RunRow> {
        sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, workflow_id, org_id, status, error,
                   triggered_by, created_at, started_at, finished_at
            FROM runs WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::RunNotFound(id))
    }

    pub async fn list_runs(
        &self,
        workflow_id: Option<Uuid>,
        limit: i64,
    ) -> StorageResult<Vec<RunRow>> {
        let rows = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, workflow_id, org_id, status, error,
                   triggered_by, created_at, started_at, finished_at
            FROM runs
            WHERE $1::uuid IS NULL OR workflow_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_run_status(
        &self,
        id: Uuid,
        fields: UpdateRunStatus,
    ) -> StorageResult<RunRow> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            UPDATE runs
            SET
                status = $2,
                started_at = COALESCE($3, started_at),
                finished_at = COALESCE($4, finished_at),
                error = COALESCE($5, error)
            WHERE id = $1
            RETURNING id, workflow_id, org_id, status, error,
                      triggered_by, created_at, started_at, finished_at
            "#,
        )
        .bind(id)
        .bind(&fields.status)
        .bind(fields.started_at)
        .bind(fields.finished_at)
        .bind(&fields.error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::RunNotFound(id))?;

        Ok(row)
    }

    // ============================================
    // Step runs
    // ============================================

    pub async fn get_step(&self, run_id: Uuid, step_id: Uuid) -> StorageResult<StepRunRow> {
        sqlx::query_as::<_, StepRunRow>(
            r#"
            SELECT id, run_id, org_id, node_id, status,
                   input_json, output_json, error, started_at, finished_at
            FROM step_runs WHERE run_id = $1 AND id = $2
            "#,
        )
        .bind(run_id)
        .bind(step_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::StepNotFound(step_id))
    }

    /// Ordered by `started_at` with nulls last, so queued steps (never
    /// started) sort after anything that has run.
    pub async fn list_steps(&self, run_id: Uuid) -> StorageResult<Vec<StepRunRow>> {
        let rows = sqlx::query_as::<_, StepRunRow>(
            r#"
            SELECT id, run_id, org_id, node_id, status,
                   input_json, output_json, error, started_at, finished_at
            FROM step_runs
            WHERE run_id = $1
            ORDER BY started_at ASC NULLS LAST
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a `queued` step row for `(run_id, node_id)`, or returns the
    /// existing row if one is already there. This is the idempotency anchor
    /// the orchestrator relies on to avoid re-running a node.
    pub async fn upsert_step(
        &self,
        run_id: Uuid,
        org_id: Option<Uuid>,
        node_id: &str,
    ) -> StorageResult<StepRunRow> {
        let id = Uuid::now_v7();
        let inserted = sqlx::query_as::<_, StepRunRow>(
            r#"
            INSERT INTO step_runs (id, run_id, org_id, node_id, status)
            VALUES ($1, $2, $3, $4, 'queued')
            ON CONFLICT (run_id, node_id) DO NOTHING
            RETURNING id, run_id, org_id, node_id, status,
                      input_json, output_json, error, started_at, finished_at
            "#,
        )
        .bind(id)
        .bind(run_id)
        .bind(org_id)
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }

        sqlx::query_as::<_, StepRunRow>(
            r#"
            SELECT id, run_id, org_id, node_id, status,
                   input_json, output_json, error, started_at, finished_at
            FROM step_runs WHERE run_id = $1 AND node_id = $2
            "#,
        )
        .bind(run_id)
        .bind(node_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)
    }

    pub async fn update_step(&self, id: Uuid, fields: UpdateStep) -> StorageResult<StepRunRow> {
        sqlx::query_as::<_, StepRunRow>(
            r#"
            UPDATE step_runs
            SET
                status = COALESCE($2, status),
                input_json = COALESCE($3, input_json),
                output_json = COALESCE($4, output_json),
                error = COALESCE($5, error),
                started_at = COALESCE($6, started_at),
                finished_at = COALESCE($7, finished_at)
            WHERE id = $1
            RETURNING id, run_id, org_id, node_id, status,
                      input_json, output_json, error, started_at, finished_at
            "#,
        )
        .bind(id)
        .bind(&fields.status)
        .bind(&fields.input_json)
        .bind(&fields.output_json)
        .bind(&fields.error)
        .bind(fields.started_at)
        .bind(fields.finished_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::StepNotFound(id))
    }
}

/// Convenience used by the orchestrator when it needs "now" stamped
/// consistently across a single state transition.
pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}
