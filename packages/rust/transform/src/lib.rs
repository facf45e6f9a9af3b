//! Stock transforms producing JSON values.
//!
//! Stage manifests refer to these by [`TransformKind`]; programmatic users
//! can also wrap any closure with the adapters in `materializer_shared`.

mod markdown;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use materializer_shared::{MaterializerError, Result, Transform};

pub use markdown::html_to_markdown;

/// The built-in content transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    /// Content unchanged, as a JSON string.
    Text,
    /// Content with surrounding whitespace removed.
    Trim,
    /// Array of lines.
    Lines,
    /// Content parsed as JSON.
    Json,
    /// Content parsed as TOML, re-expressed as JSON.
    Toml,
    /// HTML converted to Markdown.
    Markdown,
}

impl TransformKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Trim => "trim",
            Self::Lines => "lines",
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Markdown => "markdown",
        }
    }

    /// Run the transform synchronously.
    pub fn run(self, content: &str) -> Result<Value> {
        match self {
            Self::Text => Ok(Value::String(content.to_string())),
            Self::Trim => Ok(Value::String(content.trim().to_string())),
            Self::Lines => Ok(Value::Array(
                content
                    .lines()
                    .map(|line| Value::String(line.to_string()))
                    .collect(),
            )),
            Self::Json => serde_json::from_str(content)
                .map_err(|e| MaterializerError::parse(format!("invalid JSON: {e}"))),
            Self::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| MaterializerError::parse(format!("invalid TOML: {e}")))?;
                serde_json::to_value(table).map_err(|e| {
                    MaterializerError::parse(format!("TOML not representable as JSON: {e}"))
                })
            }
            Self::Markdown => html_to_markdown(content).map(Value::String),
        }
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// [`Transform`] running one of the [`TransformKind`]s.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTransform {
    kind: TransformKind,
}

impl BuiltinTransform {
    pub fn new(kind: TransformKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Transform<Value> for BuiltinTransform {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    #[instrument(skip_all, fields(kind = %self.kind, bytes = content.len()))]
    async fn apply(&self, content: String) -> Result<Value> {
        self.kind.run(&content)
    }
}
