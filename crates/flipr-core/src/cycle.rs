// ── Refresh cycle ──
//
// One cycle: a single discovery call, a cadence check per discovered id,
// concurrent fetches for the stale ones, then assembly into a new
// `Snapshot`. Any failure fails the whole cycle.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{StreamExt, TryStreamExt, stream};
use tokio::time::Instant;
use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{DeviceData, DeviceKind, DeviceRecord};
use crate::source::{DeviceSource, Discovery};
use crate::store::Snapshot;

/// What to do with one discovered id.
#[derive(Debug)]
pub(crate) enum Step {
    /// Fresh enough: carry the prior record forward, `last_read` unchanged.
    Reuse(Arc<DeviceRecord>),
    Fetch { id: String, kind: DeviceKind },
}

/// Decide reuse or fetch for every discovered id.
///
/// A prior record is reused iff it has the same kind and is younger than
/// that kind's cadence. Ids reported twice fail the cycle.
pub(crate) fn plan(
    discovery: Discovery,
    prior: &Snapshot,
    config: &CoordinatorConfig,
    now: Instant,
) -> Result<Vec<Step>, CoreError> {
    let tagged = discovery
        .probes
        .into_iter()
        .map(|id| (id, DeviceKind::Probe))
        .chain(discovery.hubs.into_iter().map(|id| (id, DeviceKind::Hub)));

    let mut seen = HashSet::new();
    let mut steps = Vec::new();

    for (id, kind) in tagged {
        if !seen.insert(id.clone()) {
            return Err(CoreError::DuplicateDevice { identifier: id });
        }

        let step = match prior.find(&id) {
            Some(record) if record.kind() == kind && record.age(now) < config.cadence(kind) => {
                debug!(device = %id, ?kind, "record fresh, skipping fetch");
                Step::Reuse(Arc::clone(record))
            }
            _ => Step::Fetch { id, kind },
        };
        steps.push(step);
    }

    Ok(steps)
}

/// Run one cycle against `source` and assemble the resulting snapshot.
pub(crate) async fn collect<S: DeviceSource>(
    source: &S,
    prior: &Snapshot,
    config: &CoordinatorConfig,
) -> Result<Snapshot, CoreError> {
    let discovery = source.discover().await?;
    debug!(
        probes = discovery.probes.len(),
        hubs = discovery.hubs.len(),
        "discovery complete"
    );

    let steps = plan(discovery, prior, config, Instant::now())?;

    let records: Vec<DeviceRecord> = stream::iter(steps)
        .map(|step| run_step(source, step))
        .buffered(config.max_concurrent_fetches.max(1))
        .try_collect()
        .await?;

    Snapshot::new(records)
}

/// Records are stamped with the time the read was issued, not when it
/// returned.
async fn run_step<S: DeviceSource>(source: &S, step: Step) -> Result<DeviceRecord, CoreError> {
    let (id, kind) = match step {
        Step::Reuse(record) => return Ok(Arc::unwrap_or_clone(record)),
        Step::Fetch { id, kind } => (id, kind),
    };

    let (issued, issued_wall) = (Instant::now(), Utc::now());
    let data = match kind {
        DeviceKind::Probe => {
            debug!(device = %id, "fetching probe measure");
            DeviceData::Probe(source.fetch_probe(&id).await?)
        }
        DeviceKind::Hub => {
            debug!(device = %id, "fetching hub state");
            DeviceData::Hub(source.fetch_hub(&id).await?)
        }
    };
    Ok(DeviceRecord::read_at(id, data, issued, issued_wall))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::{HubMode, HubState};
    use crate::testing::probe_measure;

    fn discovery(probes: &[&str], hubs: &[&str]) -> Discovery {
        Discovery {
            probes: probes.iter().map(ToString::to_string).collect(),
            hubs: hubs.iter().map(ToString::to_string).collect(),
        }
    }

    fn prior(now: Instant) -> Snapshot {
        let probe = DeviceRecord {
            last_read: now,
            ..DeviceRecord::fresh("P1", DeviceData::Probe(probe_measure()))
        };
        let hub = DeviceRecord {
            last_read: now,
            ..DeviceRecord::fresh(
                "H1",
                DeviceData::Hub(HubState {
                    state: true,
                    mode: HubMode::Auto,
                }),
            )
        };
        Snapshot::new([probe, hub]).unwrap()
    }

    fn fetched(steps: &[Step]) -> Vec<&str> {
        steps
            .iter()
            .filter_map(|s| match s {
                Step::Fetch { id, .. } => Some(id.as_str()),
                Step::Reuse(_) => None,
            })
            .collect()
    }

    #[test]
    fn empty_prior_fetches_everything() {
        let config = CoordinatorConfig::default();
        let steps = plan(
            discovery(&["P1"], &["H1"]),
            &Snapshot::empty(),
            &config,
            Instant::now(),
        )
        .unwrap();
        assert_eq!(fetched(&steps), vec!["P1", "H1"]);
    }

    #[test]
    fn cadence_is_per_kind() {
        let config = CoordinatorConfig::default();
        let t0 = Instant::now();
        let snap = prior(t0);

        let steps = plan(discovery(&["P1"], &["H1"]), &snap, &config, t0 + Duration::from_secs(200))
            .unwrap();
        assert!(fetched(&steps).is_empty());

        let steps = plan(discovery(&["P1"], &["H1"]), &snap, &config, t0 + Duration::from_secs(300))
            .unwrap();
        assert_eq!(fetched(&steps), vec!["H1"]);

        let steps =
            plan(discovery(&["P1"], &["H1"]), &snap, &config, t0 + Duration::from_secs(3600))
                .unwrap();
        assert_eq!(fetched(&steps), vec!["P1", "H1"]);
    }

    #[test]
    fn kind_change_forces_fetch() {
        let config = CoordinatorConfig::default();
        let t0 = Instant::now();
        // H1 now reported as a probe
        let steps = plan(discovery(&["H1"], &[]), &prior(t0), &config, t0).unwrap();
        assert_eq!(fetched(&steps), vec!["H1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_read_is_stamped_when_issued() {
        let source = crate::testing::MockSource::new(&[], &["H1"]);
        source.set_hub_read_delay(Duration::from_secs(10));
        let issued = Instant::now();

        let record = run_step(
            &source,
            Step::Fetch {
                id: "H1".into(),
                kind: DeviceKind::Hub,
            },
        )
        .await
        .unwrap();

        assert!(issued.elapsed() >= Duration::from_secs(10));
        assert_eq!(record.last_read, issued);
    }

    #[test]
    fn id_reported_under_both_kinds_is_rejected() {
        let config = CoordinatorConfig::default();
        let err = plan(
            discovery(&["X1"], &["X1"]),
            &Snapshot::empty(),
            &config,
            Instant::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateDevice { ref identifier } if identifier == "X1"));
    }
}
