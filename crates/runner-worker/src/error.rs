use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("workflow fetch failed: {0}")]
    WorkflowFetch(String),
    #[error("workflow has no nodes")]
    EmptyWorkflow,
    #[error(transparent)]
    Plan(#[from] runner_core::PlanError),
    #[error(transparent)]
    Storage(#[from] runner_storage::StorageError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
