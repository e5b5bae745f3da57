//! Config subcommand handlers.

use std::fmt::Write;
use std::time::Duration;

use dialoguer::{Input, Password, Select};
use secrecy::SecretString;

use flipr_api::{Credentials, FliprClient, TransportConfig};
use flipr_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Mask the plaintext password, if any.
fn redacted(mut cfg: Config) -> Config {
    if cfg.account.password.is_some() {
        cfg.account.password = Some("****".into());
    }
    cfg
}

fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "[account]");
    match cfg.account.email {
        Some(ref email) => {
            let _ = writeln!(out, "email = \"{email}\"");
        }
        None => {
            let _ = writeln!(out, "# email not set");
        }
    }
    if let Some(ref pw) = cfg.account.password {
        let _ = writeln!(out, "password = \"{pw}\"");
    }
    if let Some(ref env) = cfg.account.password_env {
        let _ = writeln!(out, "password_env = \"{env}\"");
    }

    let p = &cfg.polling;
    let _ = writeln!(out, "\n[polling]");
    let _ = writeln!(out, "interval_secs = {}", p.interval_secs);
    let _ = writeln!(out, "probe_cadence_secs = {}", p.probe_cadence_secs);
    let _ = writeln!(out, "hub_cadence_secs = {}", p.hub_cadence_secs);
    let _ = writeln!(out, "cycle_timeout_secs = {}", p.cycle_timeout_secs);
    let _ = writeln!(out, "max_concurrent_fetches = {}", p.max_concurrent_fetches);

    let _ = writeln!(out, "\n[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = write!(out, "timeout = {}", cfg.defaults.timeout);

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Offer keyring storage. Returns the password when the user picks plaintext.
fn prompt_storage(email: &str, password: String) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        flipr_config::store_password(email, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password))
    }
}

// ── Init ────────────────────────────────────────────────────────────

async fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = flipr_config::load_config()?;
    eprintln!("Flipr CLI configuration");
    eprintln!("   Config path: {}\n", flipr_config::config_path().display());

    let mut input = Input::<String>::new().with_prompt("Flipr account email");
    if let Some(email) = global.email.clone().or_else(|| cfg.account.email.clone()) {
        input = input.default(email);
    }
    let email = input.interact_text().map_err(prompt_err)?;

    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(prompt_err)?;

    if email.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "email and password cannot be empty".into(),
        });
    }

    // One authenticated call proves the credentials before anything is saved.
    eprintln!("   Checking credentials...");
    let timeout = Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    let client = FliprClient::new(
        Credentials::new(email.clone(), SecretString::from(password.clone())),
        &TransportConfig::default().with_timeout(timeout),
    )?;
    let ids = client.search_all_ids().await?;
    eprintln!(
        "   ✓ Found {} analyser(s) and {} Hub(s)",
        ids.flipr.len(),
        ids.hub.len()
    );

    let plaintext = prompt_storage(&email, password)?;

    cfg.account.email = Some(email);
    cfg.account.password = plaintext;
    let path = flipr_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("\n  Test it: flipr devices");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global).await,

        ConfigCommand::Show => {
            let cfg = redacted(flipr_config::load_config()?);
            let out = output::render_single(global.format(), &cfg, format_config, |c| {
                c.account.email.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = flipr_config::config_path();
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
