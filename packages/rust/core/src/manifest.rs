//! Declarative stage manifests.
//!
//! A manifest names the stage and lists its units in TOML:
//!
//! ```toml
//! stage = "fetch-docs"
//!
//! [[units]]
//! key = "readme"
//! transport = "file"
//! transform = "markdown"
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use materializer_shared::{MaterializerError, Result, Transform, Transport, TransportConfig};
use materializer_transform::{BuiltinTransform, TransformKind};
use materializer_transport::{AutoTransport, FileTransport, HttpTransport};

use crate::unit::{StageSpec, Unit};

/// Which stock transport a unit uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Http,
    File,
    #[default]
    Auto,
}

/// Root of a stage manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageManifest {
    /// Overrides `[notification] stage_name` from the app config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(default)]
    pub units: Vec<UnitManifest>,
}

/// `[[units]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitManifest {
    pub key: String,
    #[serde(default)]
    pub transport: TransportKind,
    pub transform: TransformKind,
}

/// Parse a manifest from TOML text.
pub fn parse_manifest(content: &str) -> Result<StageManifest> {
    toml::from_str(content)
        .map_err(|e| MaterializerError::config(format!("invalid stage manifest: {e}")))
}

/// Load a manifest from disk.
pub fn load_manifest(path: &Path) -> Result<StageManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| MaterializerError::io(path, e))?;
    parse_manifest(&content).map_err(|e| match e {
        MaterializerError::Config { message } => {
            MaterializerError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Build the stage spec described by `manifest`.
///
/// Units sharing a transport kind share one transport instance.
pub fn build_spec(manifest: &StageManifest, config: &TransportConfig) -> Result<StageSpec<Value>> {
    let mut http: Option<Arc<dyn Transport>> = None;
    let mut file: Option<Arc<dyn Transport>> = None;
    let mut auto: Option<Arc<dyn Transport>> = None;

    let mut units = Vec::with_capacity(manifest.units.len());
    for entry in &manifest.units {
        let transport = match entry.transport {
            TransportKind::Http => {
                shared(&mut http, || Ok(Arc::new(HttpTransport::new(config)?)))?
            }
            TransportKind::File => {
                shared(&mut file, || Ok(Arc::new(FileTransport::new(config))))?
            }
            TransportKind::Auto => {
                shared(&mut auto, || Ok(Arc::new(AutoTransport::new(config)?)))?
            }
        };
        let transform: Arc<dyn Transform<Value>> =
            Arc::new(BuiltinTransform::new(entry.transform));
        units.push(Unit::from_shared(entry.key.clone(), transport, transform));
    }

    StageSpec::new(units)
}

fn shared(
    slot: &mut Option<Arc<dyn Transport>>,
    make: impl FnOnce() -> Result<Arc<dyn Transport>>,
) -> Result<Arc<dyn Transport>> {
    if let Some(existing) = slot {
        return Ok(Arc::clone(existing));
    }
    let created = make()?;
    *slot = Some(Arc::clone(&created));
    Ok(created)
}
