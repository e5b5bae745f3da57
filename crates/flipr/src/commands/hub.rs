//! Hub commands, issued through the switch and select entities.

use std::sync::Arc;

use flipr_core::entity::{HubModeSelect, HubSwitch};
use flipr_core::{Coordinator, CoreError, DeviceRecord};

use crate::cli::{GlobalOpts, HubArgs, HubCommand};
use crate::error::CliError;
use crate::output;

use super::devices;

fn detail(record: &Arc<DeviceRecord>, color: bool) -> String {
    [
        format!("Hub:   {}", record.id),
        format!("State: {}", devices::summary(record, color)),
        format!("Read:  {}", devices::age(record)),
    ]
    .join("\n")
}

pub async fn handle(
    coordinator: &Coordinator,
    args: HubArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = match args.command {
        HubCommand::On { id } => {
            HubSwitch::new(coordinator, &id).turn_on().await?;
            id
        }
        HubCommand::Off { id } => {
            HubSwitch::new(coordinator, &id).turn_off().await?;
            id
        }
        HubCommand::Mode { id, mode } => {
            HubModeSelect::new(coordinator, &id)
                .select_option(&mode)
                .await?;
            id
        }
    };

    let record = coordinator
        .find(&id)
        .ok_or(CoreError::DeviceNotFound { identifier: id })?;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.format(),
        &record,
        |r| detail(r, color),
        |r| r.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
