use flipr_api::FliprClient;
use strum::EnumIter;

use super::{ATTRIBUTION, EntityBase};
use crate::coordinator::Coordinator;
use crate::model::{MeasureStatus, ProbeMeasure};
use crate::source::DeviceSource;

/// Problem indicators derived from the analyser's verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum BinarySensorKind {
    PhStatus,
    ChlorineStatus,
}

impl BinarySensorKind {
    pub const fn key(self) -> &'static str {
        match self {
            Self::PhStatus => "ph_status",
            Self::ChlorineStatus => "chlorine_status",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PhStatus => "pH Status",
            Self::ChlorineStatus => "Chlorine Status",
        }
    }

    fn status(self, measure: &ProbeMeasure) -> Option<MeasureStatus> {
        match self {
            Self::PhStatus => measure.ph_status,
            Self::ChlorineStatus => measure.chlorine_status,
        }
    }
}

/// On when the analyser rates a value too low or too high.
pub struct FliprBinarySensor<S: DeviceSource = FliprClient> {
    base: EntityBase<S>,
    kind: BinarySensorKind,
}

impl<S: DeviceSource> FliprBinarySensor<S> {
    pub const DEVICE_CLASS: &'static str = "problem";

    pub fn new(coordinator: &Coordinator<S>, device_id: &str, kind: BinarySensorKind) -> Self {
        Self {
            base: EntityBase::new(coordinator, device_id, kind.key()),
            kind,
        }
    }

    pub fn base(&self) -> &EntityBase<S> {
        &self.base
    }

    pub fn kind(&self) -> BinarySensorKind {
        self.kind
    }

    pub fn name(&self) -> String {
        format!("Flipr {} {}", self.base.device_id(), self.kind.label())
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    /// The raw verdict behind [`is_on`](Self::is_on).
    pub fn status(&self) -> Option<MeasureStatus> {
        let record = self.base.record()?;
        self.kind.status(record.data.as_probe()?)
    }

    pub fn is_on(&self) -> Option<bool> {
        self.status().map(MeasureStatus::is_problem)
    }
}
