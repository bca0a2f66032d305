// ── Snapshot store ──
//
// Holds the last published snapshot behind a `watch` channel. A refresh
// replaces the whole map at once, so readers never see a half-built
// cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{Snapshot, SpotData, SpotId};

/// Outcome of the most recent refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateStatus {
    /// `false` until the first cycle, and after any failed one.
    pub last_update_success: bool,
    /// When the snapshot was last replaced.
    pub last_success_at: Option<DateTime<Utc>>,
}

pub struct SnapshotStore {
    snapshot: watch::Sender<Arc<Snapshot>>,
    status: watch::Sender<UpdateStatus>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::new()));
        let (status, _) = watch::channel(UpdateStatus::default());
        Self { snapshot, status }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn spot(&self, id: &SpotId) -> Option<SpotData> {
        self.snapshot.borrow().get(id).cloned()
    }

    pub fn status(&self) -> UpdateStatus {
        *self.status.borrow()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.status.subscribe()
    }

    // ── Writes (coordinator only) ────────────────────────────────────

    pub(crate) fn publish(&self, snapshot: Snapshot) {
        self.snapshot.send_replace(Arc::new(snapshot));
        self.status.send_replace(UpdateStatus {
            last_update_success: true,
            last_success_at: Some(Utc::now()),
        });
    }

    /// Record a failed cycle. The snapshot itself is left alone.
    pub(crate) fn mark_failed(&self) {
        self.status.send_modify(|s| s.last_update_success = false);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
