//! Stock transports for resource units.
//!
//! This crate provides:
//! - [`HttpTransport`] — fetches `http`/`https` locations
//! - [`FileTransport`] — reads `file://` URLs and plain paths
//! - [`AutoTransport`] — picks one of the above from the location's scheme

mod file;
mod http;

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use materializer_shared::{Result, Transport, TransportConfig};

pub use file::FileTransport;
pub use http::HttpTransport;

/// Dispatches to [`HttpTransport`] for `http`/`https` locations and to
/// [`FileTransport`] for everything else.
#[derive(Debug, Clone)]
pub struct AutoTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl AutoTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(config)?,
            file: FileTransport::new(config),
        })
    }
}

/// Whether `location` parses as an `http`/`https` URL.
fn is_http(location: &str) -> bool {
    Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[async_trait]
impl Transport for AutoTransport {
    fn name(&self) -> &str {
        "auto"
    }

    async fn fetch(&self, location: &str) -> Result<String> {
        if is_http(location) {
            trace!(location, "dispatching to http");
            self.http.fetch(location).await
        } else {
            trace!(location, "dispatching to file");
            self.file.fetch(location).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_detection() {
        assert!(is_http("https://docs.example.com/a"));
        assert!(is_http("http://localhost:3000"));
        assert!(!is_http("file:///tmp/a.txt"));
        assert!(!is_http("docs/intro.md"));
        assert!(!is_http("C:/docs/intro.md"));
    }

    #[tokio::test]
    async fn auto_dispatches_by_scheme() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("remote"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("local.txt"), "local").unwrap();

        let transport = AutoTransport::new(&TransportConfig {
            base_dir: Some(dir.path().to_path_buf()),
            ..TransportConfig::default()
        })
        .unwrap();

        assert_eq!(transport.fetch(&server.uri()).await.unwrap(), "remote");
        assert_eq!(transport.fetch("local.txt").await.unwrap(), "local");
    }
}
