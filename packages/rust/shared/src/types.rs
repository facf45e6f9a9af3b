//! Core domain types: resources and the resource map.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A single entry of the resource map.
///
/// A resource is an immutable snapshot: producing a new value goes through
/// [`Resource::with_value`], which builds a fresh entry and leaves `self`
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<V = serde_json::Value> {
    /// Opaque location (path or URI) handed to the unit's transport.
    pub path: String,
    /// Last value computed by a transform. An absent field is `None`; a
    /// present one, even `null`, is `Some`.
    #[serde(
        default,
        deserialize_with = "present_value",
        bound(deserialize = "V: Deserialize<'de>"),
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<V>,
    /// Any other attributes the hosting workflow attached to the entry.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl<V> Resource<V> {
    /// A resource with a location and nothing else.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
            attributes: BTreeMap::new(),
        }
    }

    /// A copy of this entry with `value` replaced; every other attribute is kept.
    pub fn with_value(&self, value: V) -> Self {
        Self {
            path: self.path.clone(),
            value: Some(value),
            attributes: self.attributes.clone(),
        }
    }
}

fn present_value<'de, D, V>(deserializer: D) -> Result<Option<V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    V::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// ResourceMap
// ---------------------------------------------------------------------------

/// Resource entries keyed by logical resource name, iterated in key order.
///
/// Entries are shared: cloning the map is a shallow copy, and an entry left
/// alone by a stage is the same allocation in its output.
pub type ResourceMap<V = serde_json::Value> = BTreeMap<String, Arc<Resource<V>>>;

/// Build a resource map from `(key, resource)` pairs.
pub fn resource_map<V, K, I>(entries: I) -> ResourceMap<V>
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Resource<V>)>,
{
    entries
        .into_iter()
        .map(|(key, resource)| (key.into(), Arc::new(resource)))
        .collect()
}

// ---------------------------------------------------------------------------
// DryRunConfig
// ---------------------------------------------------------------------------

/// Per-invocation dry-run controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunConfig {
    /// Skip the notification phase entirely.
    pub suppress_notification: bool,
    /// Replace fetch/transform with a timed no-op.
    pub simulate: bool,
    /// How long the simulated run sleeps.
    pub simulate_delay: Duration,
}

impl DryRunConfig {
    /// A live run that notifies and processes every matched key.
    pub fn live() -> Self {
        Self::default()
    }

    /// A simulated run sleeping for `delay`.
    pub fn simulated(delay: Duration) -> Self {
        Self {
            suppress_notification: false,
            simulate: true,
            simulate_delay: delay,
        }
    }

    /// Same configuration with notifications suppressed.
    pub fn without_notification(mut self) -> Self {
        self.suppress_notification = true;
        self
    }
}
