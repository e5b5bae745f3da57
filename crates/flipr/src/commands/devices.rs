//! Device listing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tabled::Tabled;

use flipr_core::model::MeasureStatus;
use flipr_core::{Coordinator, DeviceData, DeviceKind, DeviceRecord};

use crate::cli::{DevicesArgs, GlobalOpts, KindFilter};
use crate::error::CliError;
use crate::output::{self, paint};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Read")]
    read: String,
}

fn row(record: &Arc<DeviceRecord>, color: bool) -> DeviceRow {
    DeviceRow {
        id: record.id.clone(),
        kind: record.kind().to_string(),
        state: summary(record, color),
        read: age(record),
    }
}

// ── Shared formatting ───────────────────────────────────────────────

/// One-line state of a device, colored by verdict.
pub(crate) fn summary(record: &DeviceRecord, color: bool) -> String {
    match &record.data {
        DeviceData::Probe(m) => {
            let healthy = |status: Option<MeasureStatus>| !status.is_some_and(MeasureStatus::is_problem);
            let mut parts = Vec::new();
            if let Some(t) = m.temperature {
                parts.push(format!("{t:.1} °C"));
            }
            if let Some(ph) = m.ph {
                parts.push(paint(&format!("pH {ph:.2}"), healthy(m.ph_status), color));
            }
            if let Some(cl) = m.chlorine {
                parts.push(paint(&format!("Cl {cl:.2} mV"), healthy(m.chlorine_status), color));
            }
            if let Some(b) = m.battery {
                parts.push(format!("battery {b:.0}%"));
            }
            parts.join("  ")
        }
        DeviceData::Hub(h) => {
            let state = if h.state { "on" } else { "off" };
            format!("{} ({})", paint(state, h.state, color), h.mode)
        }
    }
}

/// Time since the record was read, e.g. "3m 12s ago".
pub(crate) fn age(record: &DeviceRecord) -> String {
    let secs = (Utc::now() - record.fetched_at).num_seconds().max(0).unsigned_abs();
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    coordinator: &Coordinator,
    args: &DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = args.kind.map(|k| match k {
        KindFilter::Probe => DeviceKind::Probe,
        KindFilter::Hub => DeviceKind::Hub,
    });

    let snapshot = coordinator.get_snapshot();
    let records: Vec<Arc<DeviceRecord>> = snapshot
        .iter()
        .filter(|r| kind.is_none_or(|k| r.kind() == k))
        .cloned()
        .collect();

    let color = output::should_color(global.color);
    let out = output::render_list(
        global.format(),
        &records,
        |r| row(r, color),
        |r| r.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
