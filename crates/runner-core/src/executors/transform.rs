// Transform executor
//
// A bounded, non-Turing-complete interpreter: either a `{output_key: path}`
// map, or a handful of string forms (dotted path, "$."-prefixed path, or a
// simplified `.map(x => ...)` / `.filter(x => ...)` list projection). Never
// evaluates arbitrary code.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::{ExecutorError, ExecutorResult};
use crate::executor::NodeExecutor;

pub struct TransformExecutor;

#[async_trait]
impl NodeExecutor for TransformExecutor {
    async fn execute(&self, config: &Value, input: Option<&Value>) -> ExecutorResult<Value> {
        let input = input.cloned().unwrap_or(Value::Null);

        let expr = config
            .get("script")
            .filter(|v| !v.is_null())
            .or_else(|| config.get("expression"))
            .cloned();

        let expr = match expr {
            Some(e) if !e.is_null() => e,
            _ => {
                return Err(ExecutorError::validation(
                    "expression or script is required for transform node",
                ))
            }
        };

        if let Value::String(s) = &expr {
            if s.is_empty() {
                return Err(ExecutorError::validation(
                    "expression or script is required for transform node",
                ));
            }
        }

        Ok(apply_expression(&expr, &input))
    }
}

/// Resolve `expr` against `input`, dispatching on the expression shape.
pub fn apply_expression(expr: &Value, input: &Value) -> Value {
    match expr {
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (output_key, path_value) in map {
                let path = match path_value {
                    Value::String(s) => s.as_str(),
                    _ => {
                        result.insert(output_key.clone(), Value::Null);
                        continue;
                    }
                };
                result.insert(output_key.clone(), get_nested_value(input, path));
            }
            Value::Object(result)
        }
        Value::String(expr) => apply_string_expression(expr, input),
        _ => input.clone(),
    }
}

fn apply_string_expression(expr: &str, input: &Value) -> Value {
    if expr.contains(".map(") || expr.contains(".filter(") {
        return apply_list_projection(expr, input);
    }

    if let Some(rest) = expr.strip_prefix("data.").or_else(|| expr.strip_prefix("input.")) {
        return get_nested_value(input, rest);
    }

    if let Some(rest) = expr.strip_prefix("$.") {
        return get_nested_value(input, rest);
    }

    get_nested_value(input, expr)
}

fn map_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.map\([^=]+=>\s*([^)]+)\)").unwrap())
}

fn filter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.filter\([^=]+=>\s*([^)]+)\)").unwrap())
}

fn apply_list_projection(expr: &str, input: &Value) -> Value {
    let Value::Array(items) = input else {
        return input.clone();
    };

    if expr.contains(".map(") {
        if let Some(caps) = map_regex().captures(expr) {
            let field = caps[1].trim().replace("x.", "").replace("item.", "");
            let projected: Vec<Value> = items
                .iter()
                .map(|item| match item {
                    Value::Object(obj) => obj.get(&field).cloned().unwrap_or(Value::Null),
                    other => other.clone(),
                })
                .collect();
            return Value::Array(projected);
        }
    }

    if expr.contains(".filter(") {
        if filter_regex().is_match(expr) {
            // Simplified, as in the source: retain truthy elements only.
            let filtered: Vec<Value> = items.iter().filter(|v| is_truthy(v)).cloned().collect();
            return Value::Array(filtered);
        }
    }

    input.clone()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Dot-path resolution: map lookup for objects, numeric index for arrays,
/// `null` for anything else or a missing key.
pub fn get_nested_value(data: &Value, path: &str) -> Value {
    let mut current = data.clone();
    for key in path.split('.') {
        if key.is_empty() {
            continue;
        }
        current = match &current {
            Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
            Value::Array(list) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| list.get(i).cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
        if current.is_null() {
            return Value::Null;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn dict_mapping_resolves_each_path() {
        let input = json!({"a": {"b": 1}, "c": 2});
        let config = json!({"expression": {"x": "a.b", "y": "c", "z": "missing.path"}});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!({"x": 1, "y": 2, "z": null}));
    }

    #[tokio::test]
    async fn data_prefix_is_stripped() {
        let input = json!({"status_code": 200});
        let config = json!({"expression": "data.status_code"});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!(200));
    }

    #[tokio::test]
    async fn dollar_prefix_is_stripped() {
        let input = json!({"status_code": 200});
        let config = json!({"expression": "$.status_code"});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!(200));
    }

    #[tokio::test]
    async fn bare_path_with_no_prefix() {
        let input = json!({"nested": {"value": 42}});
        let config = json!({"expression": "nested.value"});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn list_index_resolves() {
        let input = json!({"items": [10, 20, 30]});
        let config = json!({"expression": "items.1"});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!(20));
    }

    #[tokio::test]
    async fn map_projection_extracts_field() {
        let input = json!([{"value": 1}, {"value": 2}]);
        let config = json!({"expression": "data.map(x => x.value)"});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!([1, 2]));
    }

    #[tokio::test]
    async fn filter_projection_keeps_truthy() {
        let input = json!([1, 0, "a", "", null]);
        let config = json!({"expression": "data.filter(x => x.active)"});
        let out = TransformExecutor.execute(&config, Some(&input)).await.unwrap();
        assert_eq!(out, json!([1, "a"]));
    }

    #[tokio::test]
    async fn missing_expression_is_validation_error() {
        let err = TransformExecutor
            .execute(&json!({}), Some(&json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Validation(_)));
    }

    #[test]
    fn path_resolution_is_idempotent() {
        let input = json!({"a": {"b": [1, 2, 3]}});
        let first = get_nested_value(&input, "a.b.1");
        let second = get_nested_value(&input, "a.b.1");
        assert_eq!(first, second);
        assert_eq!(first, json!(2));
    }
}
