//! `flipr watch`: keep the coordinator's timer running and print updates.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use flipr_core::{Coordinator, CoordinatorEvent, DeviceRecord};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, paint};

use super::devices;

/// One watch line in structured output modes.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchLine<'a> {
    Snapshot {
        at: DateTime<Utc>,
        devices: Vec<Arc<DeviceRecord>>,
    },
    Patched {
        at: DateTime<Utc>,
        device: Option<Arc<DeviceRecord>>,
    },
    Failed {
        at: DateTime<Utc>,
        reason: &'a str,
    },
}

struct Printer<'a> {
    coordinator: &'a Coordinator,
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer<'_> {
    fn snapshot(&self) -> Result<(), CliError> {
        let records: Vec<_> = self.coordinator.get_snapshot().iter().cloned().collect();
        match self.format {
            OutputFormat::Table | OutputFormat::Plain => {
                let stamp = Local::now().format("%H:%M:%S");
                let lines: Vec<String> = records
                    .iter()
                    .map(|r| format!("[{stamp}] {:<12} {}", r.id, devices::summary(r, self.color)))
                    .collect();
                self.emit(&lines.join("\n"));
                Ok(())
            }
            _ => self.structured(&WatchLine::Snapshot {
                at: Utc::now(),
                devices: records,
            }),
        }
    }

    fn patched(&self, id: &str) -> Result<(), CliError> {
        let device = self.coordinator.find(id);
        match self.format {
            OutputFormat::Table | OutputFormat::Plain => {
                let state = device
                    .as_deref()
                    .map_or_else(|| "-".into(), |r| devices::summary(r, self.color));
                let stamp = Local::now().format("%H:%M:%S");
                self.emit(&format!("[{stamp}] {id:<12} {state} (command)"));
                Ok(())
            }
            _ => self.structured(&WatchLine::Patched {
                at: Utc::now(),
                device,
            }),
        }
    }

    fn failed(&self, reason: &str) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Table | OutputFormat::Plain => {
                let stamp = Local::now().format("%H:%M:%S");
                let text = format!("update failed: {reason}");
                self.emit(&format!("[{stamp}] {}", paint(&text, false, self.color)));
                Ok(())
            }
            _ => self.structured(&WatchLine::Failed {
                at: Utc::now(),
                reason,
            }),
        }
    }

    fn structured(&self, line: &WatchLine<'_>) -> Result<(), CliError> {
        let out = match self.format {
            OutputFormat::Yaml => format!("---\n{}", output::render_yaml(line)?),
            _ => output::render_json(line, true)?,
        };
        self.emit(&out);
        Ok(())
    }

    fn emit(&self, text: &str) {
        output::print_output(text, self.quiet);
    }
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut events = coordinator.events();
    let printer = Printer {
        coordinator,
        format: global.format(),
        color: output::should_color(global.color),
        quiet: global.quiet,
    };

    printer.snapshot()?;
    info!(
        interval = ?coordinator.config().refresh_interval,
        "watching for updates, Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(CoordinatorEvent::SnapshotUpdated { .. }) => printer.snapshot()?,
                Ok(CoordinatorEvent::DevicePatched { id }) => printer.patched(&id)?,
                Ok(CoordinatorEvent::UpdateFailed { reason }) => printer.failed(&reason)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "watch fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
