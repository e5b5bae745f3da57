use std::fmt;

use chrono::{DateTime, Utc};
use flipr_api::FliprClient;
use serde::Serialize;
use strum::EnumIter;

use super::{ATTRIBUTION, EntityBase};
use crate::coordinator::Coordinator;
use crate::model::ProbeMeasure;
use crate::source::DeviceSource;

/// Measured quantities exposed per analyser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum SensorKind {
    Chlorine,
    Ph,
    Temperature,
    DateTime,
    RedOx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDeviceClass {
    Temperature,
    Timestamp,
}

/// Static presentation attributes of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub device_class: Option<SensorDeviceClass>,
}

impl SensorKind {
    pub const fn description(self) -> SensorDescription {
        match self {
            Self::Chlorine => SensorDescription {
                key: "chlorine",
                name: "Chlorine",
                unit: Some("mV"),
                icon: Some("mdi:pool"),
                device_class: None,
            },
            Self::Ph => SensorDescription {
                key: "ph",
                name: "pH",
                unit: None,
                icon: Some("mdi:pool"),
                device_class: None,
            },
            Self::Temperature => SensorDescription {
                key: "temperature",
                name: "Water Temp",
                unit: Some("°C"),
                icon: None,
                device_class: Some(SensorDeviceClass::Temperature),
            },
            Self::DateTime => SensorDescription {
                key: "date_time",
                name: "Date Measure",
                unit: None,
                icon: None,
                device_class: Some(SensorDeviceClass::Timestamp),
            },
            Self::RedOx => SensorDescription {
                key: "red_ox",
                name: "Red OX",
                unit: Some("mV"),
                icon: Some("mdi:pool"),
                device_class: None,
            },
        }
    }

    /// Read this quantity out of a measure.
    pub fn value(self, measure: &ProbeMeasure) -> Option<SensorValue> {
        match self {
            Self::Chlorine => measure.chlorine.map(SensorValue::Number),
            Self::Ph => measure.ph.map(SensorValue::Number),
            Self::Temperature => measure.temperature.map(SensorValue::Number),
            Self::DateTime => Some(SensorValue::Timestamp(measure.date_time)),
            Self::RedOx => measure.red_ox.map(SensorValue::Number),
        }
    }
}

/// A sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// One measured quantity of one analyser.
pub struct FliprSensor<S: DeviceSource = FliprClient> {
    base: EntityBase<S>,
    kind: SensorKind,
}

impl<S: DeviceSource> FliprSensor<S> {
    pub fn new(coordinator: &Coordinator<S>, device_id: &str, kind: SensorKind) -> Self {
        Self {
            base: EntityBase::new(coordinator, device_id, kind.description().key),
            kind,
        }
    }

    pub fn base(&self) -> &EntityBase<S> {
        &self.base
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn name(&self) -> String {
        format!("Flipr {} {}", self.base.device_id(), self.kind.description().name)
    }

    pub fn description(&self) -> SensorDescription {
        self.kind.description()
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    /// Current reading, `None` when the device or value is missing.
    pub fn native_value(&self) -> Option<SensorValue> {
        let record = self.base.record()?;
        self.kind.value(record.data.as_probe()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::testing::{MockSource, probe_measure};

    async fn coordinator() -> Coordinator<MockSource> {
        let source = Arc::new(MockSource::new(&["AB12"], &["H1"]));
        let coordinator = Coordinator::new(
            CoordinatorConfig {
                refresh_interval: Duration::ZERO,
                ..CoordinatorConfig::default()
            },
            source,
        );
        coordinator.setup().await.unwrap();
        coordinator
    }

    #[tokio::test(start_paused = true)]
    async fn reads_values_from_snapshot() {
        let coordinator = coordinator().await;

        let temp = FliprSensor::new(&coordinator, "AB12", SensorKind::Temperature);
        assert_eq!(temp.name(), "Flipr AB12 Water Temp");
        assert_eq!(temp.base().unique_id(), "AB12-temperature");
        assert_eq!(temp.native_value(), Some(SensorValue::Number(24.5)));
        assert_eq!(temp.description().unit, Some("°C"));

        let stamp = FliprSensor::new(&coordinator, "AB12", SensorKind::DateTime);
        assert_eq!(
            stamp.native_value(),
            Some(SensorValue::Timestamp(probe_measure().date_time))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_or_wrong_kind_device_has_no_value() {
        let coordinator = coordinator().await;

        let missing = FliprSensor::new(&coordinator, "ZZ99", SensorKind::Ph);
        assert!(!missing.base().available());
        assert_eq!(missing.native_value(), None);

        let hub = FliprSensor::new(&coordinator, "H1", SensorKind::Ph);
        assert_eq!(hub.native_value(), None);
    }

    #[test]
    fn red_ox_reads_millivolts() {
        let desc = SensorKind::RedOx.description();
        assert_eq!((desc.key, desc.name, desc.unit), ("red_ox", "Red OX", Some("mV")));
        assert_eq!(
            SensorKind::RedOx.value(&probe_measure()),
            Some(SensorValue::Number(474.0))
        );
    }
}
