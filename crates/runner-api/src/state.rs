// Shared application state: composition root for the HTTP layer.

use std::sync::Arc;

use runner_storage::Database;
use runner_worker::{EventBus, WorkflowRunner};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub bus: EventBus,
    pub runner: Arc<dyn WorkflowRunner>,
}
