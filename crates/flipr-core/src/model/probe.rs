use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Analyser verdict on a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum MeasureStatus {
    Good,
    Medium,
    TooLow,
    TooHigh,
}

impl MeasureStatus {
    /// `TooLow` and `TooHigh` call for action.
    pub fn is_problem(self) -> bool {
        matches!(self, Self::TooLow | Self::TooHigh)
    }
}

/// Latest water measure of an analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeMeasure {
    /// Free chlorine, mV.
    pub chlorine: Option<f64>,
    pub ph: Option<f64>,
    /// Water temperature, °C.
    pub temperature: Option<f64>,
    /// When the analyser took the measure.
    pub date_time: DateTime<Utc>,
    /// Oxidation-reduction potential, mV.
    pub red_ox: Option<f64>,
    pub ph_status: Option<MeasureStatus>,
    pub chlorine_status: Option<MeasureStatus>,
    /// Battery level, percent.
    pub battery: Option<f64>,
}
