// In-memory workflow runner using Tokio tasks: fast, but not durable across
// process restarts. This is the default and only backend (see module docs).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::WorkflowRunner;
use crate::error::WorkerResult;
use crate::orchestrator::{CancelSignal, Orchestrator};

struct ActiveRun {
    handle: JoinHandle<()>,
    cancel: CancelSignal,
}

pub struct InMemoryRunner {
    orchestrator: Orchestrator,
    active: Arc<RwLock<HashMap<Uuid, ActiveRun>>>,
}

impl InMemoryRunner {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl WorkflowRunner for InMemoryRunner {
    async fn start_workflow(&self, run_id: Uuid) -> WorkerResult<()> {
        info!(run_id = %run_id, "starting in-memory run execution");

        let cancel = CancelSignal::new();
        let orchestrator = self.orchestrator.clone();
        let active = self.active.clone();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            if let Err(err) = orchestrator.run(run_id, task_cancel).await {
                warn!(run_id = %run_id, error = %err, "run execution failed");
            }
            active.write().await.remove(&run_id);
        });

        self.active
            .write()
            .await
            .insert(run_id, ActiveRun { handle, cancel });

        Ok(())
    }

    async fn cancel_workflow(&self, run_id: Uuid) -> WorkerResult<()> {
        info!(run_id = %run_id, "signalling cancellation for in-memory run");
        if let Some(active) = self.active.read().await.get(&run_id) {
            active.cancel.trigger();
        }
        Ok(())
    }

    async fn is_running(&self, run_id: Uuid) -> bool {
        self.active.read().await.contains_key(&run_id)
    }

    async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    async fn shutdown(&self) -> WorkerResult<()> {
        info!("shutting down in-memory workflow runner");
        let mut active = self.active.write().await;
        for (run_id, run) in active.drain() {
            info!(run_id = %run_id, "aborting run on shutdown");
            run.handle.abort();
        }
        Ok(())
    }
}
