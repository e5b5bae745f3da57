//! Command dispatch: bridges CLI args -> coordinator -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod hub;
pub mod sensors;
pub mod watch;

use flipr_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a coordinator-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(coordinator, &args, global),
        Command::Sensors(args) => sensors::handle(coordinator, &args, global),
        Command::Hub(args) => hub::handle(coordinator, args, global).await,
        Command::Watch => watch::handle(coordinator, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
