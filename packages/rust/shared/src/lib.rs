//! Shared types, error model, capability traits and configuration for the
//! resource materializer.
//!
//! This crate is the foundation depended on by all other materializer crates.
//! It provides:
//! - [`MaterializerError`] — the unified error type
//! - Domain types ([`Resource`], [`ResourceMap`], [`DryRunConfig`])
//! - Capability traits ([`Transport`], [`Transform`]) and closure adapters
//! - Configuration ([`AppConfig`], config loading)

pub mod capability;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use capability::{
    FnTransform, FnTransport, SyncTransform, Transform, Transport, transform_fn, transform_sync,
    transport_fn,
};
pub use config::{
    AppConfig, DryRunSettings, NotificationConfig, TransportConfig, config_dir, config_file_path,
    init_config, init_config_in, load_config, load_config_from,
};
pub use error::{MaterializerError, Result, UnitStage};
pub use types::{DryRunConfig, Resource, ResourceMap, resource_map};
