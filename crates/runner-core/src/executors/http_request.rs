// HTTP request executor
//
// Retries transport errors and timeouts with exponential backoff; a non-2xx
// HTTP response is not a transport failure and is returned as-is (the
// workflow author decides what to do with `success: false`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};

use crate::error::{ExecutorError, ExecutorResult};
use crate::executor::NodeExecutor;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_COUNT: u32 = 3;
const TRUNCATE_AT: usize = 10_000;
const TRUNCATE_MARKER: &str = "... [truncated]";

pub struct HttpRequestExecutor {
    client: Client,
}

impl Default for HttpRequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequestExecutor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
    async fn execute(&self, config: &Value, input: Option<&Value>) -> ExecutorResult<Value> {
        let _ = input; // the HTTP executor only consumes its own config
        let method_str = config
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let method: Method = method_str
            .parse()
            .map_err(|_| ExecutorError::validation(format!("invalid HTTP method: {method_str}")))?;

        let url = config
            .get("url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExecutorError::validation("url is required for httpRequest node"))?;

        let mut headers = parse_headers(config.get("headers"));
        let body = prepare_body(config.get("body"), &mut headers);

        let timeout_secs = config
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let timeout = Duration::from_secs(timeout_secs);

        let retry_count = config
            .get("retry_count")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_RETRY_COUNT as u64) as u32;

        let mut last_error: Option<ExecutorError> = None;

        for attempt in 0..=retry_count {
            let mut req = self
                .client
                .request(method.clone(), url)
                .timeout(timeout);
            for (key, value) in &headers {
                req = req.header(key, value);
            }
            if let Some(body) = &body {
                req = req.body(body.clone());
            }

            match req.send().await {
                Ok(response) => return Ok(format_response(response).await),
                Err(err) => {
                    let classified = classify_error(&err);
                    tracing::warn!(
                        attempt = attempt + 1,
                        total = retry_count + 1,
                        url,
                        error = %err,
                        "HTTP request attempt failed"
                    );
                    last_error = Some(classified);
                }
            }

            if attempt < retry_count {
                let wait = Duration::from_secs(2u64.pow(attempt));
                tokio::time::sleep(wait).await;
            }
        }

        Err(last_error.unwrap_or_else(|| ExecutorError::transport("request failed")))
    }
}

fn classify_error(err: &reqwest::Error) -> ExecutorError {
    if err.is_timeout() {
        ExecutorError::timeout(err.to_string())
    } else {
        ExecutorError::transport(err.to_string())
    }
}

fn parse_headers(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default(),
        _ => Map::new(),
    }
}

/// Serialize a map body to JSON (setting `Content-Type` if absent) and pass
/// a string body through unmodified.
fn prepare_body(value: Option<&Value>, headers: &mut Map<String, Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Some(other) => {
            if !headers.contains_key("Content-Type") {
                headers.insert(
                    "Content-Type".to_string(),
                    Value::String("application/json".to_string()),
                );
            }
            Some(other.to_string())
        }
    }
}

async fn format_response(response: reqwest::Response) -> Value {
    let status_code = response.status().as_u16();
    let success = (200..300).contains(&status_code);

    let response_headers: Map<String, Value> = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                Value::String(v.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    let bytes = response.bytes().await.unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes).to_string();

    let response_body = match serde_json::from_str::<Value>(&text) {
        Ok(parsed) => truncate_if_needed(parsed),
        Err(_) => truncate_text(text),
    };

    json!({
        "status_code": status_code,
        "response_headers": Value::Object(response_headers),
        "response_body": response_body,
        "success": success,
    })
}

fn truncate_if_needed(parsed: Value) -> Value {
    let serialized = serde_json::to_string(&parsed).unwrap_or_default();
    if serialized.len() > TRUNCATE_AT {
        Value::String(truncate_string(&serialized))
    } else {
        parsed
    }
}

fn truncate_text(text: String) -> Value {
    if text.len() > TRUNCATE_AT {
        Value::String(truncate_string(&text))
    } else {
        Value::String(text)
    }
}

fn truncate_string(s: &str) -> String {
    let cut = floor_char_boundary(s, TRUNCATE_AT);
    format!("{}{}", &s[..cut], TRUNCATE_MARKER)
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut idx = index.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn missing_url_is_validation_error() {
        let executor = HttpRequestExecutor::new();
        let err = executor.execute(&json!({}), None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Validation(_)));
    }

    #[tokio::test]
    async fn get_with_json_body_returns_parsed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let executor = HttpRequestExecutor::new();
        let config = json!({ "url": format!("{}/echo", server.uri()) });
        let out = executor.execute(&config, None).await.unwrap();

        assert_eq!(out["status_code"], json!(200));
        assert_eq!(out["success"], json!(true));
        assert_eq!(out["response_body"], json!({"ok": true}));
    }

    #[tokio::test]
    async fn non_2xx_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let executor = HttpRequestExecutor::new();
        let config = json!({ "url": format!("{}/broken", server.uri()), "retry_count": 0 });
        let out = executor.execute(&config, None).await.unwrap();

        assert_eq!(out["status_code"], json!(500));
        assert_eq!(out["success"], json!(false));
    }

    #[tokio::test]
    async fn connection_failure_retries_then_gives_up() {
        // Port 0 never accepts connections; every attempt is a transport error.
        let executor = HttpRequestExecutor::new();
        let config = json!({ "url": "http://127.0.0.1:0/", "retry_count": 1 });
        let err = executor.execute(&config, None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Transport(_)));
    }

    #[tokio::test]
    async fn large_body_is_truncated() {
        let server = MockServer::start().await;
        let huge = "x".repeat(TRUNCATE_AT + 500);
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_string(huge))
            .mount(&server)
            .await;

        let executor = HttpRequestExecutor::new();
        let config = json!({ "url": format!("{}/big", server.uri()) });
        let out = executor.execute(&config, None).await.unwrap();

        let body = out["response_body"].as_str().unwrap();
        assert!(body.ends_with(TRUNCATE_MARKER));
        assert!(body.len() <= TRUNCATE_AT + TRUNCATE_MARKER.len());
    }
}
