//! Error types for the materializer.
//!
//! Library crates use [`MaterializerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Which half of a unit's pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStage {
    /// Fetching raw content for the resource location.
    Transport,
    /// Turning fetched content into the resource value.
    Transform,
}

impl fmt::Display for UnitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => f.write_str("transport"),
            Self::Transform => f.write_str("transform"),
        }
    }
}

/// Top-level error type for all materializer operations.
#[derive(Debug, thiserror::Error)]
pub enum MaterializerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a resource.
    #[error("network error: {0}")]
    Network(String),

    /// Content could not be parsed into the requested shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Notification sink failure. Only ever logged by the materializer.
    #[error("notification error: {0}")]
    Notification(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (duplicate unit keys, malformed resource map, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A unit's transport or transform failed for `key`.
    #[error("{stage} failed for resource '{key}': {source}")]
    Unit {
        key: String,
        stage: UnitStage,
        #[source]
        source: Box<MaterializerError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MaterializerError>;

impl MaterializerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the failing resource key and pipeline stage.
    pub fn unit(key: impl Into<String>, stage: UnitStage, source: MaterializerError) -> Self {
        Self::Unit {
            key: key.into(),
            stage,
            source: Box::new(source),
        }
    }

    /// The resource key this error is attributed to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Unit { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MaterializerError::config("missing stage name");
        assert_eq!(err.to_string(), "config error: missing stage name");

        let err = MaterializerError::validation("duplicate unit key 'a'");
        assert!(err.to_string().contains("duplicate unit key"));
    }

    #[test]
    fn unit_error_carries_key_and_stage() {
        let err = MaterializerError::unit(
            "docs",
            UnitStage::Transport,
            MaterializerError::Network("HTTP 503".into()),
        );
        assert_eq!(err.key(), Some("docs"));
        assert_eq!(
            err.to_string(),
            "transport failed for resource 'docs': network error: HTTP 503"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
