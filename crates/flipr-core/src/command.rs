// ── Command API ──
//
// Hub writes flow through a `Command` enum sent to the coordinator's
// command processor task.

use crate::error::CoreError;
use crate::model::{HubMode, HubState};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Write operations against a Flipr Hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetHubState { id: String, on: bool },
    SetHubMode { id: String, mode: HubMode },
}

impl Command {
    /// The Hub this command targets.
    pub fn device_id(&self) -> &str {
        match self {
            Self::SetHubState { id, .. } | Self::SetHubMode { id, .. } => id,
        }
    }

    /// Whether `reported` is what this command asked for.
    pub fn is_confirmed_by(&self, reported: &HubState) -> bool {
        match self {
            Self::SetHubState { on, .. } => reported.state == *on,
            Self::SetHubMode { mode, .. } => reported.mode == *mode,
        }
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The Hub state reported by upstream after the write. `confirmed` is
    /// `false` when it differs from the request; the snapshot is then left
    /// untouched.
    Hub { reported: HubState, confirmed: bool },
}
