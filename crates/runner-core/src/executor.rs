// Executor registry
//
// Maps a node-type string to a `NodeExecutor`. Built at startup via
// `ExecutorRegistry::with_builtins()` and treated as read-only afterwards --
// the orchestrator holds it behind an `Arc` and never mutates it mid-run.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExecutorResult;
use crate::executors::{http_request::HttpRequestExecutor, stub, transform::TransformExecutor};

/// A capability that evaluates a single workflow node given its config and
/// the (possibly absent) input produced by its dependencies.
///
/// Implementations may be synchronous internally or suspend on I/O; either
/// way the orchestrator awaits this method directly, never blocking its own
/// task on a slow executor (see `execute_blocking` for the sync-on-a-thread
/// variant).
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, config: &Value, input: Option<&Value>) -> ExecutorResult<Value>;
}

/// Process-wide table of node-type -> executor.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the executor for `node_type`.
    pub fn register(&mut self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
        self.executors.insert(node_type.into(), executor);
    }

    /// Look up the executor for `node_type`, if any.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(node_type).cloned()
    }

    /// Build the registry with the standard built-in executors:
    /// `httpRequest`, `transform`, and the trivial stubs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("httpRequest", Arc::new(HttpRequestExecutor::new()));
        registry.register("transform", Arc::new(TransformExecutor));
        registry.register("webhookTrigger", Arc::new(stub::WebhookTriggerExecutor));
        registry.register("ifCondition", Arc::new(stub::IfConditionExecutor));
        registry.register("postgresWrite", Arc::new(stub::PostgresWriteExecutor));
        registry.register("notification", Arc::new(stub::NotificationExecutor));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_builtins_registers_all_required_types() {
        let registry = ExecutorRegistry::with_builtins();
        for ty in [
            "httpRequest",
            "transform",
            "webhookTrigger",
            "ifCondition",
            "postgresWrite",
            "notification",
        ] {
            assert!(registry.get(ty).is_some(), "missing executor for {ty}");
        }
        assert!(registry.get("doesNotExist").is_none());
    }
}
