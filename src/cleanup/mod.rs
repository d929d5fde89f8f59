//! Cleanup registration for applied manifests
//!
//! Deployments register each successfully applied manifest here so the run
//! can tear everything down later. The registry is an explicit shared handle
//! passed into every deployment call; concurrent per-cluster tasks append to
//! it through a mutex.

use std::sync::{Arc, Mutex};

/// One applied manifest, remembered for teardown.
#[derive(Clone, Debug)]
pub struct CleanupRecord {
    /// Name of the cluster the manifest was applied to.
    pub cluster: String,

    /// The applied manifest text, replayed verbatim at teardown.
    pub manifest: String,
}

/// Shared, run-scoped record of applied manifests.
///
/// Cloning yields another handle to the same underlying store. Repeated
/// registrations for the same cluster accumulate independently; there is no
/// deduplication.
#[derive(Clone, Debug, Default)]
pub struct CleanupRegistry {
    records: Arc<Mutex<Vec<CleanupRecord>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a manifest applied to `cluster`.
    pub fn register(&self, cluster: impl Into<String>, manifest: impl Into<String>) {
        let record = CleanupRecord {
            cluster: cluster.into(),
            manifest: manifest.into(),
        };
        self.records
            .lock()
            .expect("cleanup registry lock poisoned")
            .push(record);
    }

    /// Take every registered record, leaving the registry empty.
    ///
    /// Teardown calls this exactly once per run.
    pub fn drain(&self) -> Vec<CleanupRecord> {
        std::mem::take(
            &mut *self
                .records
                .lock()
                .expect("cleanup registry lock poisoned"),
        )
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .expect("cleanup registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
