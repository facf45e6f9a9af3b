//! The resource materializer pipeline stage.
//!
//! This crate provides:
//! - [`Materializer`] — fetches and transforms the resources a stage owns
//! - [`StageSpec`] / [`Unit`] — which keys a stage owns and how to load them
//! - [`notify`] — fire-and-forget "stage ran" notifications
//! - [`manifest`] — building a stage from a TOML manifest with stock capabilities

pub mod manifest;
pub mod materializer;
pub mod notify;
pub mod unit;

pub use manifest::{
    StageManifest, TransportKind, UnitManifest, build_spec, load_manifest, parse_manifest,
};
pub use materializer::{Materializer, Outcome};
pub use notify::{NoopSink, NotificationSink, WebSocketSink, dispatch, sink_from_config};
pub use unit::{StageSpec, Unit};
