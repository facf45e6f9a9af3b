//! Local filesystem transport.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use materializer_shared::{MaterializerError, Result, Transport, TransportConfig};

/// Reads resource locations from disk.
///
/// Accepts `file://` URLs and plain paths. Relative paths are resolved
/// against `base_dir` when one is configured, otherwise against the
/// process working directory.
#[derive(Debug, Clone)]
pub struct FileTransport {
    base_dir: Option<PathBuf>,
    max_response_bytes: u64,
}

impl FileTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            max_response_bytes: config.max_response_bytes,
        }
    }

    /// Map a location string to the path it names.
    pub fn resolve(&self, location: &str) -> Result<PathBuf> {
        if location.starts_with("file:") {
            let url = Url::parse(location).map_err(|e| {
                MaterializerError::validation(format!("{location}: invalid file URL: {e}"))
            })?;
            return url.to_file_path().map_err(|()| {
                MaterializerError::validation(format!("{location}: not a local file URL"))
            });
        }

        let path = Path::new(location);
        match &self.base_dir {
            Some(base) if path.is_relative() => Ok(base.join(path)),
            _ => Ok(path.to_path_buf()),
        }
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<String> {
        let path = self.resolve(location)?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| MaterializerError::io(&path, e))?;
        if meta.len() > self.max_response_bytes {
            return Err(MaterializerError::validation(format!(
                "{}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                self.max_response_bytes
            )));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| MaterializerError::io(&path, e))?;

        debug!(path = %path.display(), bytes = content.len(), "read");
        Ok(content)
    }
}
