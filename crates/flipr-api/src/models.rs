// Flipr API wire models
//
// Raw response shapes as the cloud returns them (PascalCase keys for the
// module and survey endpoints, camelCase for the Hub endpoints), plus the
// flattened types the client hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Modules ──────────────────────────────────────────────────────────

/// `ModuleType_Id` of a Flipr analyser.
pub const MODULE_TYPE_FLIPR: u32 = 1;
/// `ModuleType_Id` of a Flipr Hub.
pub const MODULE_TYPE_HUB: u32 = 2;

/// One entry of `GET /modules`.
#[derive(Debug, Clone, Deserialize)]
pub struct Module {
    #[serde(rename = "Serial")]
    pub serial: String,
    #[serde(rename = "ModuleType_Id")]
    pub module_type_id: u32,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

/// Module serials partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredIds {
    pub flipr: Vec<String>,
    pub hub: Vec<String>,
}

// ── Survey ───────────────────────────────────────────────────────────

/// A measured value with the analyser's qualitative verdict.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SurveyValue {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deviation: Option<f64>,
    /// `Good`, `Medium`, `TooLow`, `TooHigh`.
    #[serde(default)]
    pub deviation_sector: Option<String>,
}

/// Body of `GET /modules/{serial}/survey/last`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SurveyResponse {
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(rename = "PH", default)]
    pub ph: Option<SurveyValue>,
    #[serde(default)]
    pub desinfectant: Option<SurveyValue>,
    #[serde(default)]
    pub oxydo_reduction_potentiel: Option<SurveyValue>,
    #[serde(default)]
    pub battery: Option<SurveyValue>,
}

/// Latest pool measure, flattened from a [`SurveyResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMeasure {
    pub temperature: Option<f64>,
    pub ph: Option<f64>,
    pub chlorine: Option<f64>,
    pub red_ox: Option<f64>,
    pub date_time: DateTime<Utc>,
    pub ph_status: Option<String>,
    pub chlorine_status: Option<String>,
    /// Battery level in percent.
    pub battery: Option<f64>,
}

impl From<SurveyResponse> for PoolMeasure {
    fn from(raw: SurveyResponse) -> Self {
        let ph = raw.ph.unwrap_or_default();
        let chlorine = raw.desinfectant.unwrap_or_default();
        Self {
            temperature: raw.temperature,
            ph: ph.value,
            chlorine: chlorine.value,
            red_ox: raw.oxydo_reduction_potentiel.and_then(|v| v.value),
            date_time: raw.date_time,
            ph_status: ph.deviation_sector,
            chlorine_status: chlorine.deviation_sector,
            battery: raw
                .battery
                .and_then(|b| b.deviation)
                .map(|d| (d * 100.0).round()),
        }
    }
}

// ── Hub ──────────────────────────────────────────────────────────────

/// Body of the Hub state endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStateResponse {
    /// `1` when the equipment relay is closed.
    pub state_equipment: i64,
    /// Operating mode: `auto`, `manual` or `planning`.
    pub behavior: String,
}

/// Hub relay state and operating mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStatus {
    pub state: bool,
    pub mode: String,
}

impl From<HubStateResponse> for HubStatus {
    fn from(raw: HubStateResponse) -> Self {
        Self {
            state: raw.state_equipment == 1,
            mode: raw.behavior.to_lowercase(),
        }
    }
}
