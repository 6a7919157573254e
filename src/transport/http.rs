use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    application_error, parse_body, transport_error, RawResponse, RequestOptions, Transport,
};
use crate::config::ClientConfig;
use crate::error::{NoteError, Result};
use crate::normalize;

/// reqwest-backed transport. Cheap to clone; shares the connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport rooted at `base_url` with a fixed overall timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| NoteError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NoteError::Config(format!(
                "base url must be http or https, got '{}'",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| NoteError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<RawResponse> {
        debug!(method = %method, path, "dispatching request");

        let timeout = options.timeout.unwrap_or(self.timeout);
        let mut request = self.client.request(method.clone(), self.url(path));
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(t) = options.timeout {
            request = request.timeout(t);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = transport_error(&e, timeout);
                warn!(method = %method, path, error = %e, "request failed without a response");
                return Err(err);
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let err = transport_error(&e, timeout);
                warn!(method = %method, path, error = %e, "failed to read response body");
                return Err(err);
            }
        };
        let body = parse_body(&text);
        debug!(status = status.as_u16(), path, "response received");

        if !status.is_success() || normalize::is_error_envelope(&body) {
            let err = application_error(status.as_u16(), &body);
            warn!(
                method = %method,
                path,
                status = status.as_u16(),
                message = %err,
                "backend reported a failure"
            );
            return Err(err);
        }

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, TransportCause};
    use crate::transport::NO_RESPONSE_MESSAGE;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = HttpTransport::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = HttpTransport::new("ftp://example.com", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_url_joining() {
        let t = HttpTransport::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(t.base_url(), "http://localhost:5000");
        assert_eq!(t.url("/api/notes"), "http://localhost:5000/api/notes");
        assert_eq!(t.url("health"), "http://localhost:5000/health");
    }

    #[tokio::test]
    async fn test_success_carries_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notes"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"title": "T"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"note": {"id": 1}})))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server)
            .send(
                Method::POST,
                "/api/notes",
                Some(json!({"title": "T"})),
                RequestOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body["note"]["id"], 1);
    }

    #[tokio::test]
    async fn test_query_params_and_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server)
            .send(
                Method::GET,
                "/api/notes",
                None,
                RequestOptions::new().query("limit", 1),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.body, Value::Null);
    }

    #[tokio::test]
    async fn test_non_2xx_is_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes/99"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"success": false, "error": "Note not found"})),
            )
            .mount(&server)
            .await;

        let err = transport(&server)
            .send(Method::GET, "/api/notes/99", None, RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "Note not found");
    }

    #[tokio::test]
    async fn test_error_envelope_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "locked"})),
            )
            .mount(&server)
            .await;

        let err = transport(&server)
            .send(Method::DELETE, "/api/notes/3", None, RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.message(), "locked");
    }

    #[tokio::test]
    async fn test_status_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = transport(&server)
            .send(Method::GET, "/api/notes", None, RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Request failed with status 500");
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_cause() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = transport(&server)
            .send(
                Method::GET,
                "/health",
                None,
                RequestOptions::new().timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.message().contains(NO_RESPONSE_MESSAGE));
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        // Port 1: nothing listening
        let t = HttpTransport::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = t
            .send(Method::GET, "/health", None, RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NoteError::Transport {
                cause: TransportCause::Network,
                ..
            }
        ));
        assert_eq!(err.message(), NO_RESPONSE_MESSAGE);
    }
}
