//! Memoization of changelog runs.
//!
//! Results are keyed by `(base revision, max leftovers)`. Each key owns a
//! [`OnceCell`] so callers asking for the same key at the same time share a
//! single computation. A failed computation leaves its cell empty and the
//! next caller runs it again.

use crate::error::Result;
use crate::generator::ChangelogResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type CacheKey = (String, usize);
type Slot = Arc<OnceCell<Arc<ChangelogResult>>>;

/// Cache of changelog results, shared between generator handles.
#[derive(Debug, Default)]
pub struct ChangelogCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl ChangelogCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, base: &str, max_leftovers: usize) -> Slot {
        if let Ok(mut slots) = self.slots.lock() {
            return slots
                .entry((base.to_string(), max_leftovers))
                .or_default()
                .clone();
        }
        warn!(base, "Changelog cache lock poisoned, running uncached");
        Arc::new(OnceCell::new())
    }

    /// Return the cached result for the key, computing it with `init` if needed.
    ///
    /// # Errors
    ///
    /// Returns the error of `init`. Nothing is stored in that case.
    pub async fn get_or_try_init<F, Fut>(
        &self,
        base: &str,
        max_leftovers: usize,
        init: F,
    ) -> Result<Arc<ChangelogResult>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ChangelogResult>>,
    {
        let slot = self.slot(base, max_leftovers);
        if let Some(hit) = slot.get() {
            debug!(base, max_leftovers, "Changelog cache hit");
            return Ok(Arc::clone(hit));
        }
        slot.get_or_try_init(move || async move { init().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The cached result for a key, if it has been computed.
    #[must_use]
    pub fn get(&self, base: &str, max_leftovers: usize) -> Option<Arc<ChangelogResult>> {
        let slots = self.slots.lock().ok()?;
        slots
            .get(&(base.to_string(), max_leftovers))
            .and_then(|slot| slot.get().cloned())
    }

    /// Number of computed results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.values().filter(|slot| slot.initialized()).count())
            .unwrap_or(0)
    }

    /// Whether no result has been computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.clear();
        }
    }
}
