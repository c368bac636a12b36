//! Process-lifetime metadata cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use pcs_core::dependency::PackageDependenciesInfo;
use pcs_util::errors::PcsResult;

type Slot = Arc<OnceCell<Arc<PackageDependenciesInfo>>>;

/// Append-only cache of package metadata keyed by name.
///
/// Each name owns one `OnceCell`. The first caller runs the fetch; callers that
/// arrive while it is in flight wait on the same cell instead of fetching
/// again. A failed fetch leaves the cell empty so a later call can retry.
#[derive(Debug, Default)]
pub struct PackageCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl PackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        slots.entry(name.to_string()).or_default().clone()
    }

    /// Return the cached metadata for `name`, running `fetch` if nobody has yet.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        name: &str,
        fetch: F,
    ) -> PcsResult<Arc<PackageDependenciesInfo>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PcsResult<PackageDependenciesInfo>>,
    {
        let slot = self.slot(name).await;
        slot.get_or_try_init(|| async { fetch().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Cached metadata for `name`, without fetching.
    pub async fn get(&self, name: &str) -> Option<Arc<PackageDependenciesInfo>> {
        let slots = self.slots.lock().await;
        slots.get(name).and_then(|slot| slot.get().cloned())
    }

    /// Number of names with metadata present.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
