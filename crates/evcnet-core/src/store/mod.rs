// ── Reactive snapshot store ──
//
// Latest fleet snapshot with push-based change notification.

mod snapshot_store;

pub use snapshot_store::{SnapshotStore, UpdateStatus};
