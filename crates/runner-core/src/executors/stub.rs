// Stubbed executors
//
// These exist purely so that graphs containing these node types dispatch
// successfully; none of them touch the outside world.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ExecutorResult;
use crate::executor::NodeExecutor;

fn input_or_empty(input: Option<&Value>) -> Value {
    input.cloned().unwrap_or_else(|| json!({}))
}

pub struct WebhookTriggerExecutor;

#[async_trait]
impl NodeExecutor for WebhookTriggerExecutor {
    async fn execute(&self, _config: &Value, input: Option<&Value>) -> ExecutorResult<Value> {
        Ok(json!({ "triggered": true, "data": input_or_empty(input) }))
    }
}

pub struct IfConditionExecutor;

#[async_trait]
impl NodeExecutor for IfConditionExecutor {
    async fn execute(&self, _config: &Value, input: Option<&Value>) -> ExecutorResult<Value> {
        Ok(json!({ "result": true, "data": input_or_empty(input) }))
    }
}

pub struct PostgresWriteExecutor;

#[async_trait]
impl NodeExecutor for PostgresWriteExecutor {
    async fn execute(&self, _config: &Value, input: Option<&Value>) -> ExecutorResult<Value> {
        Ok(json!({ "rows_affected": 0, "data": input_or_empty(input) }))
    }
}

pub struct NotificationExecutor;

#[async_trait]
impl NodeExecutor for NotificationExecutor {
    async fn execute(&self, _config: &Value, input: Option<&Value>) -> ExecutorResult<Value> {
        Ok(json!({ "sent": true, "data": input_or_empty(input) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stubs_echo_input_under_data() {
        let input = json!({"a": 1});
        let out = WebhookTriggerExecutor
            .execute(&json!({}), Some(&input))
            .await
            .unwrap();
        assert_eq!(out["triggered"], json!(true));
        assert_eq!(out["data"], input);
    }

    #[tokio::test]
    async fn stubs_default_to_empty_object_without_input() {
        let out = NotificationExecutor.execute(&json!({}), None).await.unwrap();
        assert_eq!(out["data"], json!({}));
    }
}
