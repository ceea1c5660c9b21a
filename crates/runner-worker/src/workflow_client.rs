// Client for the external workflow-definition service: fetches the graph
// the orchestrator executes. Storage and authoring of graphs live entirely
// in that other service; this client only reads.

use reqwest::Client;
use runner_core::WorkflowGraph;
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};

#[derive(Clone)]
pub struct WorkflowClient {
    http: Client,
    base_url: String,
}

impl WorkflowClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_graph(&self, workflow_id: Uuid) -> WorkerResult<WorkflowGraph> {
        let url = format!(
            "{}/api/workflows/{workflow_id}",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| WorkerError::WorkflowFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkerError::WorkflowFetch(format!(
                "workflow service returned {}",
                response.status()
            )));
        }

        let envelope: runner_core::WorkflowGraphEnvelope = response
            .json()
            .await
            .map_err(|e| WorkerError::WorkflowFetch(e.to_string()))?;

        Ok(envelope.graph)
    }
}
