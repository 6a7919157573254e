//! Request dispatch and failure normalization.
//!
//! Every call goes through [`Transport::send`], which either yields the raw
//! successful body or a [`NoteError`] already classified as `Transport`
//! (nothing came back) or `Application` (the backend answered with a failure).

mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpTransport;
pub use reqwest::Method;

use crate::error::{NoteError, Result, TransportCause};
use crate::normalize;

pub const NO_RESPONSE_MESSAGE: &str =
    "No response from server. Please check if the backend is running.";

/// A successful response: 2xx status and a body that does not declare failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<RawResponse>;
}

/// Classify a response that arrived with a failure status or an error envelope.
pub(crate) fn application_error(status: u16, body: &Value) -> NoteError {
    let message = normalize::error_message(body)
        .unwrap_or_else(|| format!("Request failed with status {}", status));
    NoteError::Application {
        status: Some(status),
        message,
    }
}

/// Classify a request that produced no usable response.
pub(crate) fn transport_error(err: &reqwest::Error, timeout: Duration) -> NoteError {
    if err.is_timeout() {
        return NoteError::Transport {
            cause: TransportCause::Timeout,
            message: format!(
                "Request timed out after {}s. {}",
                timeout.as_secs_f64(),
                NO_RESPONSE_MESSAGE
            ),
        };
    }

    // Builder failures never left the process; the raw description is all we have.
    let message = if err.is_builder() {
        err.to_string()
    } else {
        NO_RESPONSE_MESSAGE.to_string()
    };
    NoteError::Transport {
        cause: TransportCause::Network,
        message,
    }
}

/// Decode a response body. Empty bodies become `null`; non-JSON text is kept as a string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_application_error_message_priority() {
        let err = application_error(400, &json!({"message": "bad title", "error": "x"}));
        assert_eq!(err.message(), "bad title");
        assert_eq!(err.status(), Some(400));

        let err = application_error(404, &json!({"success": false, "error": "Note not found"}));
        assert_eq!(err.message(), "Note not found");
        assert_eq!(err.kind(), ErrorKind::Application);

        let err = application_error(502, &Value::String("<html>bad gateway</html>".into()));
        assert_eq!(err.message(), "Request failed with status 502");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_body("ok"), Value::String("ok".into()));
    }

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::new()
            .query("limit", 1)
            .timeout(Duration::from_secs(2));
        assert_eq!(options.query, vec![("limit".to_string(), "1".to_string())]);
        assert_eq!(options.timeout, Some(Duration::from_secs(2)));
    }
}
