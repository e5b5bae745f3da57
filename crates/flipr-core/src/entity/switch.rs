use flipr_api::FliprClient;
use tracing::error;

use super::EntityBase;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::source::DeviceSource;

/// Relay switch of a Flipr Hub.
pub struct HubSwitch<S: DeviceSource = FliprClient> {
    base: EntityBase<S>,
}

impl<S: DeviceSource> HubSwitch<S> {
    pub const ICON: &'static str = "mdi:air-humidifier";

    pub fn new(coordinator: &Coordinator<S>, device_id: &str) -> Self {
        Self {
            base: EntityBase::new(coordinator, device_id, "hub_status"),
        }
    }

    pub fn base(&self) -> &EntityBase<S> {
        &self.base
    }

    pub fn name(&self) -> String {
        format!("Hub {}", self.base.device_id())
    }

    /// `None` when the Hub is missing from the snapshot.
    pub fn is_on(&self) -> Option<bool> {
        let record = self.base.record()?;
        record.data.as_hub().map(|hub| hub.state)
    }

    pub fn available(&self) -> bool {
        self.is_on().is_some()
    }

    pub async fn turn_on(&self) -> Result<(), CoreError> {
        self.switch(true).await
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        self.switch(false).await
    }

    async fn switch(&self, on: bool) -> Result<(), CoreError> {
        let id = self.base.device_id();
        let reported = self.base.coordinator().set_hub_state(id, on).await?;

        if reported != on {
            let action = if on { "on" } else { "off" };
            error!(device = %id, "error turning {action} the hub");
            return Err(CoreError::Rejected {
                message: format!("hub {id} stayed {} after turn {action}", if reported { "on" } else { "off" }),
            });
        }
        Ok(())
    }
}
