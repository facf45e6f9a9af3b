//! Processing units and the stage specification that holds them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use materializer_shared::{MaterializerError, Result, Transform, Transport};

/// Binds a resource key to the transport and transform that produce its value.
pub struct Unit<V> {
    key: String,
    transport: Arc<dyn Transport>,
    transform: Arc<dyn Transform<V>>,
}

impl<V> Unit<V> {
    pub fn new(
        key: impl Into<String>,
        transport: impl Transport + 'static,
        transform: impl Transform<V> + 'static,
    ) -> Self {
        Self::from_shared(key, Arc::new(transport), Arc::new(transform))
    }

    /// Build a unit from capabilities that are shared with other units.
    pub fn from_shared(
        key: impl Into<String>,
        transport: Arc<dyn Transport>,
        transform: Arc<dyn Transform<V>>,
    ) -> Self {
        Self {
            key: key.into(),
            transport,
            transform,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn transform(&self) -> &dyn Transform<V> {
        self.transform.as_ref()
    }
}

impl<V> fmt::Debug for Unit<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("key", &self.key)
            .field("transport", &self.transport.name())
            .field("transform", &self.transform.name())
            .finish()
    }
}

/// The ordered set of units a stage runs.
///
/// Keys are non-empty and unique; [`StageSpec::new`] rejects anything else.
#[derive(Debug)]
pub struct StageSpec<V> {
    units: Vec<Unit<V>>,
}

impl<V> StageSpec<V> {
    pub fn new(units: Vec<Unit<V>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if unit.key.is_empty() {
                return Err(MaterializerError::validation("unit key must not be empty"));
            }
            if !seen.insert(unit.key.as_str()) {
                return Err(MaterializerError::validation(format!(
                    "duplicate unit key '{}'",
                    unit.key
                )));
            }
        }
        Ok(Self { units })
    }

    /// A spec with no units; every key is skipped.
    pub fn empty() -> Self {
        Self { units: Vec::new() }
    }

    /// The unit bound to `key`.
    pub fn find(&self, key: &str) -> Option<&Unit<V>> {
        self.units.iter().find(|unit| unit.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|unit| unit.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use materializer_shared::{transform_sync, transport_fn};

    fn unit(key: &str) -> Unit<String> {
        Unit::new(
            key,
            transport_fn(|location: String| async move { Ok::<_, MaterializerError>(location) }),
            transform_sync(|content: String| Ok(content)),
        )
    }

    #[test]
    fn find_by_key() {
        let spec = StageSpec::new(vec![unit("a"), unit("b")]).unwrap();
        assert_eq!(spec.find("b").map(Unit::key), Some("b"));
        assert!(spec.find("c").is_none());
        assert_eq!(spec.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = StageSpec::new(vec![unit("a"), unit("a")]).unwrap_err();
        assert!(err.to_string().contains("duplicate unit key 'a'"));
    }

    #[test]
    fn empty_key_rejected() {
        let err = StageSpec::new(vec![unit("")]).unwrap_err();
        assert!(matches!(err, MaterializerError::Validation { .. }));
    }

    #[test]
    fn debug_names_capabilities() {
        let rendered = format!("{:?}", unit("a"));
        assert!(rendered.contains("transport"));
        assert!(rendered.contains("\"a\""));
    }
}
