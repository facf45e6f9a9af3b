//! Application configuration for the materializer.
//!
//! User config lives at `~/.materializer/materializer.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MaterializerError, Result};
use crate::types::DryRunConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "materializer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".materializer";

// ---------------------------------------------------------------------------
// Config structs (matching materializer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Stage notification settings.
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Dry-run defaults.
    #[serde(default)]
    pub dry_run: DryRunSettings,

    /// Stock transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// `[notification]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// WebSocket endpoint signalled when a stage runs. No endpoint, no signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,

    /// Stage name sent in the notification and used in completion notes.
    #[serde(default = "default_stage_name")]
    pub stage_name: String,

    /// Upper bound on connecting to the endpoint.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            stage_name: default_stage_name(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl NotificationConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_stage_name() -> String {
    "NodeDown".into()
}
fn default_connect_timeout() -> u64 {
    5_000
}

/// `[dry_run]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DryRunSettings {
    /// Never signal the notification endpoint.
    #[serde(default)]
    pub suppress_notification: bool,

    /// Simulate runs instead of fetching and transforming.
    #[serde(default)]
    pub simulate: bool,

    /// Simulated run duration in milliseconds.
    #[serde(default)]
    pub simulate_delay_ms: u64,
}

impl From<&DryRunSettings> for DryRunConfig {
    fn from(settings: &DryRunSettings) -> Self {
        Self {
            suppress_notification: settings.suppress_notification,
            simulate: settings.simulate,
            simulate_delay: Duration::from_millis(settings.simulate_delay_ms),
        }
    }
}

/// `[transport]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed by the HTTP transport.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Largest body either transport accepts.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,

    /// Directory relative file locations are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_response_bytes: default_max_response_bytes(),
            base_dir: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}
fn default_max_response_bytes() -> u64 {
    10 * 1024 * 1024
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.materializer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MaterializerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.materializer/materializer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MaterializerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MaterializerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file into `dir`, creating it if needed.
/// Returns the path to the created file.
pub fn init_config_in(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| MaterializerError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MaterializerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MaterializerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Create the config directory and write a default config file.
pub fn init_config() -> Result<PathBuf> {
    init_config_in(&config_dir()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("stage_name"));
        assert!(toml_str.contains("simulate_delay_ms"));
        assert!(!toml_str.contains("endpoint"));
    }

    #[test]
    fn config_with_endpoint_and_dry_run() {
        let toml_str = r#"
[notification]
endpoint = "wss://notify.example.com/stages"
stage_name = "fetch-docs"

[dry_run]
simulate = true
simulate_delay_ms = 250
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.notification.endpoint.as_ref().map(Url::as_str),
            Some("wss://notify.example.com/stages")
        );
        assert_eq!(config.notification.stage_name, "fetch-docs");
        assert_eq!(config.notification.connect_timeout(), Duration::from_secs(5));

        let dry_run = DryRunConfig::from(&config.dry_run);
        assert!(dry_run.simulate);
        assert!(!dry_run.suppress_notification);
        assert_eq!(dry_run.simulate_delay, Duration::from_millis(250));
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[notification]\nendpoint = \"not a url\"\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, MaterializerError::Config { .. }));
    }

    #[test]
    fn init_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config_in(&dir.path().join("nested")).expect("init");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.transport.timeout_secs, 30);
        assert_eq!(config.transport.max_redirects, 5);
        assert_eq!(config.notification.stage_name, "NodeDown");
    }
}
