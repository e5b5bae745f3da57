// flipr-core: Polling coordinator and reactive device snapshot between flipr-api and consumers.

pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod source;
pub mod store;
pub mod stream;

mod cycle;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorEvent, CoordinatorState};
pub use error::CoreError;
pub use source::{DeviceSource, Discovery};
pub use store::{Snapshot, SnapshotStore};
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{DeviceData, DeviceKind, DeviceRecord, HubMode, HubState, ProbeMeasure};
