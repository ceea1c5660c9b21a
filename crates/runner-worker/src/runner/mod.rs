// Decision: `WorkflowRunner` abstracts the worker-pool backend that drives
// the orchestrator. Only an in-memory, tokio-task-per-run backend is
// implemented; the trait exists so a durable backend (a real job queue) can
// be dropped in later without touching the orchestrator or the API layer.

pub mod inmemory;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::WorkerResult;

/// Which `WorkflowRunner` backend to construct, selected via `WORKFLOW_RUNNER`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunnerType {
    #[default]
    InMemory,
}

impl std::str::FromStr for RunnerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inmemory" | "in-memory" | "in_memory" | "" => Ok(RunnerType::InMemory),
            other => anyhow::bail!("unknown runner type: {other}. Use 'inmemory'"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub runner_type: RunnerType,
}

impl RunnerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let runner_type = std::env::var("WORKFLOW_RUNNER")
            .unwrap_or_default()
            .parse()?;
        Ok(Self { runner_type })
    }
}

/// Trait for the worker-pool backend that drives run execution. One task
/// per run; sequential node execution within a run; concurrent across runs.
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn start_workflow(&self, run_id: Uuid) -> WorkerResult<()>;
    async fn cancel_workflow(&self, run_id: Uuid) -> WorkerResult<()>;
    async fn is_running(&self, run_id: Uuid) -> bool;
    async fn active_count(&self) -> usize;
    async fn shutdown(&self) -> WorkerResult<()>;
}

pub fn create_runner(
    config: &RunnerConfig,
    orchestrator: crate::orchestrator::Orchestrator,
) -> Arc<dyn WorkflowRunner> {
    match config.runner_type {
        RunnerType::InMemory => {
            tracing::info!("using in-memory workflow runner");
            Arc::new(inmemory::InMemoryRunner::new(orchestrator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inmemory_variants() {
        for s in ["inmemory", "in-memory", "in_memory", "", "INMEMORY"] {
            assert_eq!(s.parse::<RunnerType>().unwrap(), RunnerType::InMemory);
        }
    }

    #[test]
    fn rejects_unknown_runner_type() {
        assert!("temporal".parse::<RunnerType>().is_err());
    }
}
