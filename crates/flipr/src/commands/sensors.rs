//! Analyser sensor readings, rendered through the entity layer.

use serde::Serialize;
use tabled::Tabled;

use flipr_core::entity::{EntitySet, SensorValue};
use flipr_core::{Coordinator, CoreError, DeviceKind};

use crate::cli::{GlobalOpts, SensorsArgs};
use crate::error::CliError;
use crate::output::{self, paint};

#[derive(Debug, Serialize)]
struct Reading {
    unique_id: String,
    device: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
    value: Option<ReadingValue>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReadingValue {
    Measure(SensorValue),
    /// Binary sensors: `true` when the analyser flags a problem.
    Problem(bool),
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Entity")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn value_text(reading: &Reading, color: bool) -> String {
    match (&reading.value, reading.unit) {
        (None, _) => "-".into(),
        (Some(ReadingValue::Measure(v)), Some(unit)) => format!("{v} {unit}"),
        (Some(ReadingValue::Measure(v)), None) => v.to_string(),
        (Some(ReadingValue::Problem(true)), _) => paint("problem", false, color),
        (Some(ReadingValue::Problem(false)), _) => paint("ok", true, color),
    }
}

fn collect(coordinator: &Coordinator, only: Option<&str>) -> Vec<Reading> {
    let set = EntitySet::build(coordinator);
    let wanted = |id: &str| only.is_none_or(|o| o == id);

    let sensors = set
        .sensors
        .iter()
        .filter(|s| wanted(s.base().device_id()))
        .map(|s| Reading {
            unique_id: s.base().unique_id(),
            device: s.base().device_id().to_owned(),
            name: s.name(),
            unit: s.description().unit,
            value: s.native_value().map(ReadingValue::Measure),
        });

    let flags = set
        .binary_sensors
        .iter()
        .filter(|b| wanted(b.base().device_id()))
        .map(|b| Reading {
            unique_id: b.base().unique_id(),
            device: b.base().device_id().to_owned(),
            name: b.name(),
            unit: None,
            value: b.is_on().map(ReadingValue::Problem),
        });

    sensors.chain(flags).collect()
}

pub fn handle(
    coordinator: &Coordinator,
    args: &SensorsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(ref id) = args.id {
        let record = coordinator
            .find(id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.clone(),
            })?;
        if record.kind() != DeviceKind::Probe {
            return Err(CliError::WrongKind {
                identifier: id.clone(),
                expected: "analyser".into(),
                kind_flag: "probe".into(),
            });
        }
    }

    let readings = collect(coordinator, args.id.as_deref());
    let color = output::should_color(global.color);
    let out = output::render_list(
        global.format(),
        &readings,
        |r| ReadingRow {
            name: r.name.clone(),
            value: value_text(r, color),
        },
        |r| format!("{}={}", r.unique_id, value_text(r, false)),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
