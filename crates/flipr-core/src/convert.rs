// ── API-to-domain conversions ──
//
// Translates flipr-api wire types into the domain model. Unknown Hub modes
// and status labels surface as errors or `None` rather than panics.

use tracing::debug;

use crate::error::CoreError;
use crate::model::{HubMode, HubState, MeasureStatus, ProbeMeasure};
use crate::source::Discovery;

impl From<flipr_api::DiscoveredIds> for Discovery {
    fn from(ids: flipr_api::DiscoveredIds) -> Self {
        Self {
            probes: ids.flipr,
            hubs: ids.hub,
        }
    }
}

fn parse_status(label: Option<&str>) -> Option<MeasureStatus> {
    let label = label?;
    match label.parse() {
        Ok(status) => Some(status),
        Err(_) => {
            debug!(label, "ignoring unknown measure status");
            None
        }
    }
}

impl From<flipr_api::PoolMeasure> for ProbeMeasure {
    fn from(m: flipr_api::PoolMeasure) -> Self {
        Self {
            chlorine: m.chlorine,
            ph: m.ph,
            temperature: m.temperature,
            date_time: m.date_time,
            red_ox: m.red_ox,
            ph_status: parse_status(m.ph_status.as_deref()),
            chlorine_status: parse_status(m.chlorine_status.as_deref()),
            battery: m.battery,
        }
    }
}

impl TryFrom<flipr_api::HubStatus> for HubState {
    type Error = CoreError;

    fn try_from(status: flipr_api::HubStatus) -> Result<Self, Self::Error> {
        let mode: HubMode = status.mode.parse().map_err(|_| CoreError::Api {
            message: format!("unknown hub mode '{}'", status.mode),
            status: None,
        })?;
        Ok(Self {
            state: status.state,
            mode,
        })
    }
}
