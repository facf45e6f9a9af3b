//! The resource materializer stage.
//!
//! Given the current resource map, fetch and transform every key that has a
//! unit in the stage spec and return a new map with those values attached.
//! The input map is only borrowed; untouched entries are shared with the
//! output.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use materializer_shared::{DryRunConfig, MaterializerError, Resource, ResourceMap, Result, UnitStage};

use crate::notify::{self, NoopSink, NotificationSink};
use crate::unit::{StageSpec, Unit};

/// What a call to [`Materializer::process`] produced.
#[derive(Debug)]
pub enum Outcome<V> {
    /// Dry run: nothing was fetched and the caller's map stands unchanged.
    Simulated { note: String },
    /// Every matched key was fetched and transformed.
    Completed {
        note: String,
        resources: ResourceMap<V>,
        /// Keys whose value was recomputed, in processing order.
        updated: Vec<String>,
        /// Keys without a unit, left as they were.
        skipped: Vec<String>,
    },
}

impl<V> Outcome<V> {
    /// Human-readable completion note for the workflow's message log.
    pub fn note(&self) -> &str {
        match self {
            Self::Simulated { note } | Self::Completed { note, .. } => note,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated { .. })
    }

    /// The new resource map, or `None` for a simulated run.
    pub fn resources(&self) -> Option<&ResourceMap<V>> {
        match self {
            Self::Simulated { .. } => None,
            Self::Completed { resources, .. } => Some(resources),
        }
    }

    pub fn into_resources(self) -> Option<ResourceMap<V>> {
        match self {
            Self::Simulated { .. } => None,
            Self::Completed { resources, .. } => Some(resources),
        }
    }
}

/// Pipeline stage that materializes resource values.
///
/// The spec is read-only after construction, so one materializer can serve
/// concurrent `process` calls on different maps.
///
/// Notifications run detached from `process`. A host that is about to shut
/// its runtime down calls [`Materializer::flush_notifications`] first, or
/// in-flight sends are cancelled with the runtime.
pub struct Materializer<V> {
    stage: String,
    spec: StageSpec<V>,
    sink: Arc<dyn NotificationSink>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl<V> Materializer<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(
        stage: impl Into<String>,
        spec: StageSpec<V>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            stage: stage.into(),
            spec,
            sink,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// A materializer whose notifications go nowhere.
    pub fn without_notifications(stage: impl Into<String>, spec: StageSpec<V>) -> Self {
        Self::new(stage, spec, Arc::new(NoopSink))
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn spec(&self) -> &StageSpec<V> {
        &self.spec
    }

    /// Wait up to `limit` for notifications dispatched by earlier `process`
    /// calls. Returns `false` if some were still in flight when it gave up.
    pub async fn flush_notifications(&self, limit: Duration) -> bool {
        let handles = std::mem::take(&mut *self.pending());
        if handles.is_empty() {
            return true;
        }

        let count = handles.len();
        match tokio::time::timeout(limit, join_all(handles)).await {
            Ok(_) => {
                debug!(count, "notifications flushed");
                true
            }
            Err(_) => {
                warn!(count, limit_ms = limit.as_millis(), "notifications still in flight");
                false
            }
        }
    }

    fn pending(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        // Only handles live behind the lock; a poisoned guard is still usable.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run the stage over `current`.
    ///
    /// Keys are processed one at a time in map order. The first transport or
    /// transform failure aborts the call with [`MaterializerError::Unit`] and
    /// no map is returned.
    #[instrument(skip_all, fields(stage = %self.stage, resources = current.len(), simulate = dry_run.simulate))]
    pub async fn process(
        &self,
        current: &ResourceMap<V>,
        dry_run: &DryRunConfig,
    ) -> Result<Outcome<V>> {
        if !dry_run.suppress_notification {
            // Detached; its result never reaches this call.
            let handle = notify::dispatch(Arc::clone(&self.sink), self.stage.as_str());
            let mut pending = self.pending();
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }

        if dry_run.simulate {
            tokio::time::sleep(dry_run.simulate_delay).await;
            info!(delay_ms = dry_run.simulate_delay.as_millis(), "dry run complete");
            return Ok(Outcome::Simulated {
                note: format!("{} completed in dry-run mode", self.stage),
            });
        }

        let start = Instant::now();
        let mut resources = current.clone();
        let mut updated = Vec::new();
        let mut skipped = Vec::new();

        for (key, resource) in current {
            let Some(unit) = self.spec.find(key) else {
                debug!(%key, "skipping resource: no unit bound");
                skipped.push(key.clone());
                continue;
            };

            let value = run_unit(unit, resource).await?;
            resources.insert(key.clone(), Arc::new(resource.with_value(value)));
            updated.push(key.clone());
        }

        info!(
            updated = updated.len(),
            skipped = skipped.len(),
            duration_ms = start.elapsed().as_millis(),
            "stage completed"
        );

        Ok(Outcome::Completed {
            note: format!("{} completed", self.stage),
            resources,
            updated,
            skipped,
        })
    }
}

/// Transport then transform for one resource; errors carry the key and stage.
async fn run_unit<V>(unit: &Unit<V>, resource: &Resource<V>) -> Result<V> {
    debug!(
        key = unit.key(),
        path = %resource.path,
        transport = unit.transport().name(),
        transform = unit.transform().name(),
        "materializing resource"
    );

    let content = unit
        .transport()
        .fetch(&resource.path)
        .await
        .map_err(|e| MaterializerError::unit(unit.key(), UnitStage::Transport, e))?;

    unit.transform()
        .apply(content)
        .await
        .map_err(|e| MaterializerError::unit(unit.key(), UnitStage::Transform, e))
}
