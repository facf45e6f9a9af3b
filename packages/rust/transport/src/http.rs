//! HTTP(S) transport backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use materializer_shared::{MaterializerError, Result, Transport, TransportConfig};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("Materializer/", env!("CARGO_PKG_VERSION"));

/// Fetches resource locations over HTTP(S) and returns the response body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_response_bytes: u64,
}

impl HttpTransport {
    /// Build a transport from the `[transport]` config section.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                MaterializerError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<String> {
        let url = Url::parse(location)
            .map_err(|e| MaterializerError::validation(format!("{location}: invalid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MaterializerError::validation(format!(
                "{url}: unsupported scheme for HTTP transport"
            )));
        }

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| MaterializerError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaterializerError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_response_bytes {
                return Err(MaterializerError::validation(format!(
                    "{url}: response too large ({len} bytes, max {})",
                    self.max_response_bytes
                )));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MaterializerError::Network(format!("{url}: failed to read body: {e}")))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_response_bytes {
                return Err(MaterializerError::validation(format!(
                    "{url}: response too large (over {} bytes)",
                    self.max_response_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(%url, %status, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(&TransportConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn fetches_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/docs/intro.html"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<h1>Intro</h1>"))
            .mount(&server)
            .await;

        let body = transport()
            .fetch(&format!("{}/docs/intro.html", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<h1>Intro</h1>");
    }

    #[tokio::test]
    async fn non_success_status_is_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = transport()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, MaterializerError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let config = TransportConfig {
            max_response_bytes: 16,
            ..TransportConfig::default()
        };
        let err = HttpTransport::new(&config)
            .unwrap()
            .fetch(&server.uri())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn unannounced_oversized_body_rejected() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Chunked response without Content-Length.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await.unwrap();
            let mut response =
                String::from("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n");
            for _ in 0..8 {
                response.push_str(&format!("10\r\n{}\r\n", "y".repeat(16)));
            }
            response.push_str("0\r\n\r\n");
            let _ = stream.write_all(response.as_bytes()).await;
        });

        let config = TransportConfig {
            max_response_bytes: 40,
            ..TransportConfig::default()
        };
        let err = HttpTransport::new(&config)
            .unwrap()
            .fetch(&format!("http://{addr}/stream"))
            .await
            .unwrap_err();
        assert!(matches!(err, MaterializerError::Validation { .. }));
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn rejects_non_http_location() {
        let err = transport().fetch("file:///etc/hosts").await.unwrap_err();
        assert!(matches!(err, MaterializerError::Validation { .. }));
    }
}
