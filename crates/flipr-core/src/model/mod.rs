// ── Domain model ──
//
// Device records as held in a snapshot. Kind-specific payloads are a tagged
// enum so a record's kind and data shape can never disagree.

mod device;
mod hub;
mod probe;

pub use device::{DeviceData, DeviceKind, DeviceRecord};
pub use hub::{HubMode, HubState};
pub use probe::{MeasureStatus, ProbeMeasure};
