// ── Entity layer ──
//
// Sensor, binary-sensor, switch and select handles built on the
// coordinator's read API. Each entity holds a coordinator clone and a
// device id and re-reads the snapshot on every access.

mod binary_sensor;
mod select;
mod sensor;
mod switch;

use std::sync::Arc;

use flipr_api::FliprClient;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::coordinator::Coordinator;
use crate::model::{DeviceKind, DeviceRecord};
use crate::source::DeviceSource;

pub use binary_sensor::{BinarySensorKind, FliprBinarySensor};
pub use select::HubModeSelect;
pub use sensor::{FliprSensor, SensorDescription, SensorDeviceClass, SensorKind, SensorValue};
pub use switch::HubSwitch;

pub const DOMAIN: &str = "flipr";
pub const NAME: &str = "Flipr";
pub const MANUFACTURER: &str = "CTAC-TECH";
pub const ATTRIBUTION: &str = "Flipr Data";

/// Registry information shared by every entity of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: (&'static str, String),
    pub name: &'static str,
    pub manufacturer: &'static str,
}

impl DeviceInfo {
    pub fn for_device(id: &str) -> Self {
        Self {
            identifiers: (DOMAIN, id.to_owned()),
            name: NAME,
            manufacturer: MANUFACTURER,
        }
    }
}

// ── Shared entity plumbing ───────────────────────────────────────

/// Coordinator handle plus the device and attribute an entity exposes.
pub struct EntityBase<S: DeviceSource = FliprClient> {
    coordinator: Coordinator<S>,
    device_id: String,
    key: &'static str,
}

impl<S: DeviceSource> Clone for EntityBase<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            device_id: self.device_id.clone(),
            key: self.key,
        }
    }
}

impl<S: DeviceSource> EntityBase<S> {
    fn new(coordinator: &Coordinator<S>, device_id: &str, key: &'static str) -> Self {
        Self {
            coordinator: coordinator.clone(),
            device_id: device_id.to_owned(),
            key,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// `{device_id}-{key}`, stable across restarts.
    pub fn unique_id(&self) -> String {
        format!("{}-{}", self.device_id, self.key)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_device(&self.device_id)
    }

    pub fn record(&self) -> Option<Arc<DeviceRecord>> {
        self.coordinator.find(&self.device_id)
    }

    pub fn available(&self) -> bool {
        self.record().is_some()
    }

    pub(crate) fn coordinator(&self) -> &Coordinator<S> {
        &self.coordinator
    }
}

// ── Entity enumeration ───────────────────────────────────────────

/// Every entity for the devices currently in the snapshot.
pub struct EntitySet<S: DeviceSource = FliprClient> {
    pub sensors: Vec<FliprSensor<S>>,
    pub binary_sensors: Vec<FliprBinarySensor<S>>,
    pub switches: Vec<HubSwitch<S>>,
    pub selects: Vec<HubModeSelect<S>>,
}

impl<S: DeviceSource> EntitySet<S> {
    /// Enumerate entities per kind from [`Coordinator::list_ids`].
    /// Empty before the first refresh.
    pub fn build(coordinator: &Coordinator<S>) -> Self {
        let probes = coordinator.list_ids(DeviceKind::Probe);
        let hubs = coordinator.list_ids(DeviceKind::Hub);

        Self {
            sensors: probes
                .iter()
                .flat_map(|id| SensorKind::iter().map(move |k| FliprSensor::new(coordinator, id, k)))
                .collect(),
            binary_sensors: probes
                .iter()
                .flat_map(|id| {
                    BinarySensorKind::iter().map(move |k| FliprBinarySensor::new(coordinator, id, k))
                })
                .collect(),
            switches: hubs.iter().map(|id| HubSwitch::new(coordinator, id)).collect(),
            selects: hubs
                .iter()
                .map(|id| HubModeSelect::new(coordinator, id))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len() + self.binary_sensors.len() + self.switches.len() + self.selects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
