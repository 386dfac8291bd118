//! Website Carbon API client.
//!
//! One GET per target URL, bounded by the configured timeout. Every failure
//! comes back as a [`FetchError`] so the caller can fall back to synthesis.

use crate::error::FetchError;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Top-level JSON object returned by the estimation service, passed through
/// without schema validation.
pub type RemoteRecord = Map<String, Value>;

/// HTTP client for the carbon estimation endpoint.
pub struct CarbonClient {
    endpoint: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl CarbonClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(FetchError::Request)?;

        Ok(Self {
            endpoint: endpoint.into(),
            timeout_seconds,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the carbon estimate for a single URL.
    pub async fn fetch_remote(&self, target: &str) -> Result<RemoteRecord, FetchError> {
        info!("Fetching carbon estimate for {}", target);

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("url", target)])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Body(e.to_string()))?;

        match value {
            Value::Object(record) => {
                debug!(
                    "Remote estimate fields: {:?}",
                    record.keys().collect::<Vec<_>>()
                );
                Ok(record)
            }
            other => Err(FetchError::Body(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout_seconds)
        } else if e.is_connect() {
            FetchError::Connect(self.endpoint.clone())
        } else {
            FetchError::Request(e)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve exactly one canned HTTP response on a local port and report the
    /// request line that was received.
    fn serve_once(status_line: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let first_line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(first_line);
            let _ = stream.write_all(response.as_bytes());
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_fetch_success_passes_object_through() {
        let (endpoint, requests) =
            serve_once("200 OK", r#"{"green":true,"rating":"B","statistics":{"co2":1.2}}"#);
        let client = CarbonClient::new(endpoint, 5).unwrap();

        let record = client.fetch_remote("https://example.com").await.unwrap();

        assert_eq!(record.get("green"), Some(&Value::Bool(true)));
        assert_eq!(record.get("rating").and_then(|v| v.as_str()), Some("B"));
        assert!(record.contains_key("statistics"));

        let request_line = requests.recv().unwrap();
        assert!(request_line.starts_with("GET /?url=https%3A%2F%2Fexample.com"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let (endpoint, _requests) = serve_once("503 Service Unavailable", r#"{"error":"busy"}"#);
        let client = CarbonClient::new(endpoint, 5).unwrap();

        let err = client.fetch_remote("https://example.com").await.unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("busy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unparsable_body() {
        let (endpoint, _requests) = serve_once("200 OK", "<html>not json</html>");
        let client = CarbonClient::new(endpoint, 5).unwrap();

        let err = client.fetch_remote("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Body(_)));
    }

    #[tokio::test]
    async fn test_fetch_non_object_body() {
        let (endpoint, _requests) = serve_once("200 OK", "[1, 2, 3]");
        let client = CarbonClient::new(endpoint, 5).unwrap();

        let err = client.fetch_remote("https://example.com").await.unwrap_err();
        match err {
            FetchError::Body(message) => assert!(message.contains("an array")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = CarbonClient::new(format!("http://127.0.0.1:{}", port), 5).unwrap();

        let result = tokio_test::block_on(client.fetch_remote("https://example.com"));
        assert!(matches!(result, Err(FetchError::Connect(_))));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            // Accept and hold the connection without ever answering.
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(5));
        });

        let client = CarbonClient::new(format!("http://{}", addr), 1).unwrap();
        let err = client.fetch_remote("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(1)));
    }
}
