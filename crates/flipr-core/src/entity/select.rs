use flipr_api::FliprClient;
use strum::IntoEnumIterator;
use tracing::error;

use super::EntityBase;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::HubMode;
use crate::source::DeviceSource;

/// Operating-mode selector of a Flipr Hub.
pub struct HubModeSelect<S: DeviceSource = FliprClient> {
    base: EntityBase<S>,
}

impl<S: DeviceSource> HubModeSelect<S> {
    pub const ICON: &'static str = "mdi:air-humidifier";

    pub fn new(coordinator: &Coordinator<S>, device_id: &str) -> Self {
        Self {
            base: EntityBase::new(coordinator, device_id, "hub_mode"),
        }
    }

    pub fn base(&self) -> &EntityBase<S> {
        &self.base
    }

    pub fn unique_id(&self) -> String {
        format!("{}-flipr-hub-mode-select", self.base.device_id())
    }

    pub fn name(&self) -> String {
        format!("Flipr {} Hub mode", self.base.device_id())
    }

    pub fn options(&self) -> Vec<&'static str> {
        HubMode::iter().map(Into::into).collect()
    }

    pub fn current_option(&self) -> Option<HubMode> {
        let record = self.base.record()?;
        record.data.as_hub().map(|hub| hub.mode)
    }

    /// Validate `option` and ask the Hub to switch to it.
    pub async fn select_option(&self, option: &str) -> Result<HubMode, CoreError> {
        let mode: HubMode = option.parse().map_err(|_| CoreError::ValidationFailed {
            message: format!(
                "Can't set the hub mode to {option}. Allowed modes are: {}",
                self.options().join(", ")
            ),
        })?;

        let id = self.base.device_id();
        let reported = self.base.coordinator().set_hub_mode(id, mode).await?;
        if reported != mode {
            error!(device = %id, %mode, %reported, "error changing hub mode");
            return Err(CoreError::Rejected {
                message: format!("hub {id} stayed in {reported} mode instead of {mode}"),
            });
        }
        Ok(reported)
    }
}
