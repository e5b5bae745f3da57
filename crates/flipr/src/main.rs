mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use flipr_api::{FliprClient, TransportConfig};
use flipr_config::Config;
use flipr_core::Coordinator;

use crate::cli::{Cli, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.quiet);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a coordinator
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global).await,

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "flipr", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = flipr_config::load_config()?;
            if cli.global.output.is_none() {
                cli.global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
            }

            let watching = matches!(cmd, Command::Watch);
            let coordinator = build_coordinator(&cfg, &cli.global, watching)?;
            coordinator.setup().await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &coordinator, &cli.global).await;
            coordinator.shutdown().await;
            result
        }
    }
}

/// Build a coordinator from the config file and CLI overrides.
///
/// Only `watch` keeps the periodic timer; every other command reads the
/// snapshot produced by setup and exits.
fn build_coordinator(
    cfg: &Config,
    global: &GlobalOpts,
    watching: bool,
) -> Result<Coordinator, CliError> {
    let credentials = cfg.credentials(global.email.as_deref())?;
    let mut core_config = cfg.to_coordinator_config()?;
    if !watching {
        core_config.refresh_interval = Duration::ZERO;
        core_config.refresh_after_command = false;
    }

    let timeout = Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    let transport = TransportConfig::default().with_timeout(timeout);
    let client = FliprClient::new(credentials, &transport)?;

    Ok(Coordinator::new(core_config, Arc::new(client)))
}
