use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use tokio::time::Instant;

use super::{HubState, ProbeMeasure};

/// Kind of a Flipr module. Determines refresh cadence and which
/// operations are allowed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    /// Flipr analyser floating in the pool.
    Probe,
    /// Flipr Hub relay driving pool equipment.
    Hub,
}

/// Kind-specific payload of a [`DeviceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DeviceData {
    Probe(ProbeMeasure),
    Hub(HubState),
}

impl DeviceData {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Probe(_) => DeviceKind::Probe,
            Self::Hub(_) => DeviceKind::Hub,
        }
    }

    pub fn as_probe(&self) -> Option<&ProbeMeasure> {
        match self {
            Self::Probe(m) => Some(m),
            Self::Hub(_) => None,
        }
    }

    pub fn as_hub(&self) -> Option<&HubState> {
        match self {
            Self::Hub(h) => Some(h),
            Self::Probe(_) => None,
        }
    }
}

/// One physical device as of its last authoritative read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    /// Module serial, assigned upstream.
    pub id: String,
    #[serde(flatten)]
    pub data: DeviceData,
    /// Monotonic time of the last successful fetch or confirmed command.
    /// Cadence decisions use this exclusively.
    #[serde(skip)]
    pub last_read: Instant,
    /// Wall-clock twin of `last_read`, for display.
    pub fetched_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// A record read just now.
    pub fn fresh(id: impl Into<String>, data: DeviceData) -> Self {
        Self::read_at(id, data, Instant::now(), Utc::now())
    }

    /// A record for a read issued at `issued`. A read must rank older than
    /// any write confirmed after it was sent, however long it took to return.
    pub fn read_at(
        id: impl Into<String>,
        data: DeviceData,
        issued: Instant,
        issued_wall: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            data,
            last_read: issued,
            fetched_at: issued_wall,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.data.kind()
    }

    /// Time elapsed since `last_read`, saturating at zero.
    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_read)
    }
}
