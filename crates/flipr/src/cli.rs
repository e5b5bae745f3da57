//! Clap derive structures for the `flipr` CLI.
//!
//! Compiled twice: into the binary and into build.rs for man pages, so
//! it must only depend on clap and clap_complete.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// flipr -- read your pool analyser and drive your Flipr Hub
#[derive(Debug, Parser)]
#[command(
    name = "flipr",
    version,
    about = "Monitor Flipr pool analysers and control Flipr Hubs",
    long_about = "Reads water measures from Flipr analysers and drives Flipr Hub relays\n\
        through the Flipr cloud API.\n\n\
        Credentials come from the config file (see `flipr config init`),\n\
        FLIPR_* environment variables, or the system keyring.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Flipr account email (overrides the config file)
    #[arg(long, short = 'e', env = "FLIPR_EMAIL", global = true)]
    pub email: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "FLIPR_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, env = "FLIPR_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List discovered analysers and Hubs with their latest state
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show analyser sensor readings
    #[command(alias = "s")]
    Sensors(SensorsArgs),

    /// Switch a Hub on or off, or change its mode
    Hub(HubArgs),

    /// Keep polling and print every update until Ctrl-C
    Watch,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only list devices of this kind
    #[arg(long, short = 'k')]
    pub kind: Option<KindFilter>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindFilter {
    /// Flipr analysers
    Probe,
    /// Flipr Hubs
    Hub,
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorsArgs {
    /// Analyser serial (all analysers when omitted)
    pub id: Option<String>,
}

// ── Hub ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HubArgs {
    #[command(subcommand)]
    pub command: HubCommand,
}

#[derive(Debug, Subcommand)]
pub enum HubCommand {
    /// Turn the Hub relay on
    On {
        /// Hub serial
        id: String,
    },

    /// Turn the Hub relay off
    Off {
        /// Hub serial
        id: String,
    },

    /// Set the Hub operating mode
    Mode {
        /// Hub serial
        id: String,

        /// auto, manual or planning
        mode: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
