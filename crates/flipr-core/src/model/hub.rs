use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Hub operating mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HubMode {
    /// Hub follows the analyser's recommendations.
    Auto,
    /// Relay driven by explicit on/off commands.
    Manual,
    /// Relay follows the schedule configured in the Flipr app.
    Planning,
}

/// Hub relay state and operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubState {
    /// `true` when the equipment relay is on.
    pub state: bool,
    pub mode: HubMode,
}
