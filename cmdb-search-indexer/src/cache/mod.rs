//! Auxiliary caches read by the transformers.
//!
//! Each cache holds one immutable snapshot behind a reader/writer lock. A
//! rebuild queries the primary store without holding the lock, then swaps
//! in the new snapshot; readers clone the current `Arc` and never see a
//! partially built one.

mod enum_labels;
mod exclusion;
mod refresh;

pub use enum_labels::{EnumLabelCache, EnumLabels};
pub use exclusion::{ExclusionCache, ExclusionSet};
pub use refresh::{exclusion_refresh_loop, enum_refresh_loop, spawn_refresh_loops, RefreshTasks};

use std::sync::{Arc, PoisonError, RwLock};

/// An atomically replaceable snapshot.
#[derive(Debug, Default)]
pub(crate) struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub(crate) fn load(&self) -> Arc<T> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store(&self, next: T) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}
