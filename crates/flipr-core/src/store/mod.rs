// ── Snapshot storage ──
//
// The immutable `Snapshot` value and the `SnapshotStore` that publishes it.

mod snapshot;
mod snapshot_store;

pub use snapshot::Snapshot;
pub use snapshot_store::SnapshotStore;
