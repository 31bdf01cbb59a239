//! OpenAI-compatible chat completions over plain HTTP.
//!
//! Talks to `/chat/completions` directly so that HTTP 429 and the
//! `retry-after` / `retry-after-ms` headers reach the retry caller.

use super::{Completion, CompletionOptions, StructuredCompleter, TokenUsage};
use crate::error::Result;
use crate::openai::http_client;
use crate::retry::{CallError, CallResult};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat completions client.
pub struct OpenAIChatCompleter {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAIChatCompleter {
    pub fn new(api_base: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

/// Read a retry hint from `retry-after-ms` or `retry-after` (seconds, may be fractional).
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
    };

    if let Some(ms) = header("retry-after-ms") {
        return Some(Duration::from_millis(ms.round() as u64));
    }
    header("retry-after").map(Duration::from_secs_f64)
}

/// Map an HTTP status onto the retry taxonomy.
fn classify_status(status: StatusCode, headers: &HeaderMap, body: String) -> CallError {
    let message = format!("HTTP {}: {}", status.as_u16(), body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        CallError::RateLimited {
            retry_after: parse_retry_after(headers),
            message,
        }
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        CallError::Transient(message)
    } else {
        CallError::Fatal(message)
    }
}

#[async_trait]
impl StructuredCompleter for OpenAIChatCompleter {
    #[instrument(skip(self, system, user, options), fields(model = %self.model))]
    async fn complete_structured(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> CallResult<Completion> {
        let mut body = json!({
            "model": self.model,
            "temperature": options.temperature,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        if options.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &headers, text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CallError::Transient(format!("invalid response body: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let usage = parsed.usage.unwrap_or_default();

        debug!(tokens = usage.total_tokens, "completion received");
        Ok(Completion { content, usage })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1500)));

        headers.insert("retry-after-ms", HeaderValue::from_static("250"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(250)));

        let mut bad = HeaderMap::new();
        bad.insert("retry-after", HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&bad), None);
    }

    #[test]
    fn test_classify_status() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2"));

        match classify_status(StatusCode::TOO_MANY_REQUESTS, &headers, "slow".into()) {
            CallError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)))
            }
            other => panic!("unexpected {:?}", other),
        }

        let empty = HeaderMap::new();
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, &empty, String::new()),
            CallError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, &empty, String::new()),
            CallError::Transient(_)
        ));
        assert!(classify_status(StatusCode::UNAUTHORIZED, &empty, String::new()).is_fatal());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let completer = OpenAIChatCompleter::new(
            "https://api.example.com/v1/",
            "key",
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(completer.endpoint(), "https://api.example.com/v1/chat/completions");
        assert_eq!(completer.model(), "gpt-4o-mini");
    }
}
