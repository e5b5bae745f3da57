// Flipr Hub endpoints
//
// Read and drive the equipment relay. Both write calls answer with the
// Hub's resulting state, which may differ from what was requested.

use tracing::debug;

use crate::client::FliprClient;
use crate::error::Error;
use crate::models::{HubStateResponse, HubStatus};

impl FliprClient {
    /// Current relay state and mode of a Hub.
    ///
    /// `GET /hub/{serial}/state`
    pub async fn get_hub_state(&self, hub_id: &str) -> Result<HubStatus, Error> {
        debug!(hub_id, "fetching hub state");
        let raw: HubStateResponse = self.get(&format!("/hub/{hub_id}/state")).await?;
        Ok(raw.into())
    }

    /// Switch the Hub relay on or off. This forces the Hub into manual mode.
    ///
    /// `POST /hub/{serial}/Manual/{True|False}`
    pub async fn set_hub_state(&self, hub_id: &str, on: bool) -> Result<HubStatus, Error> {
        let flag = if on { "True" } else { "False" };
        debug!(hub_id, on, "setting hub state");
        let raw: HubStateResponse = self.post(&format!("/hub/{hub_id}/Manual/{flag}")).await?;
        Ok(raw.into())
    }

    /// Change the Hub operating mode (`auto`, `manual`, `planning`).
    ///
    /// `PUT /hub/{serial}/mode/{mode}`
    pub async fn set_hub_mode(&self, hub_id: &str, mode: &str) -> Result<HubStatus, Error> {
        debug!(hub_id, mode, "setting hub mode");
        let raw: HubStateResponse = self.put(&format!("/hub/{hub_id}/mode/{mode}")).await?;
        Ok(raw.into())
    }
}
