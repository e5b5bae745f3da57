// ── Runtime coordinator configuration ──
//
// Polling cadence and concurrency limits. The CLI builds a
// `CoordinatorConfig` from its config file and hands it in;
// core never reads config files.

use std::time::Duration;

use crate::model::DeviceKind;

/// Global timer interval between refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Minimum age before an analyser measure is fetched again.
pub const DEFAULT_PROBE_CADENCE: Duration = Duration::from_secs(3600);
/// Minimum age before a Hub state is fetched again.
pub const DEFAULT_HUB_CADENCE: Duration = Duration::from_secs(300);
/// Upper bound on one whole refresh cycle.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(100);

/// Tuning for a [`Coordinator`](crate::Coordinator).
///
/// Fixed after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How often the timer triggers a refresh cycle. Zero disables the timer.
    pub refresh_interval: Duration,
    /// Staleness threshold for analyser records.
    pub probe_cadence: Duration,
    /// Staleness threshold for Hub records.
    pub hub_cadence: Duration,
    /// Deadline for a whole cycle (discovery plus every fetch).
    pub cycle_timeout: Duration,
    /// Maximum number of per-device fetches in flight during one cycle.
    pub max_concurrent_fetches: usize,
    /// Request a refresh after each confirmed command.
    pub refresh_after_command: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            probe_cadence: DEFAULT_PROBE_CADENCE,
            hub_cadence: DEFAULT_HUB_CADENCE,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            max_concurrent_fetches: 8,
            refresh_after_command: true,
        }
    }
}

impl CoordinatorConfig {
    /// Staleness threshold for a device kind.
    pub fn cadence(&self, kind: DeviceKind) -> Duration {
        match kind {
            DeviceKind::Probe => self.probe_cadence,
            DeviceKind::Hub => self.hub_cadence,
        }
    }
}
