//! Configuration for the Flipr CLI.
//!
//! One TOML file per account, `FLIPR_*` environment overrides, password
//! resolution (env + keyring + plaintext), and translation to
//! `flipr_core::CoordinatorConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use flipr_api::Credentials;
use flipr_core::CoordinatorConfig;

/// Keyring service name under which passwords are stored.
pub const KEYRING_SERVICE: &str = "flipr";

/// Environment variable consulted when `password_env` is unset or empty.
pub const PASSWORD_ENV: &str = "FLIPR_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no account email configured")]
    NoEmail,

    #[error("no password found for '{email}'")]
    NoPassword { email: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub account: Account,

    #[serde(default)]
    pub polling: Polling,

    #[serde(default)]
    pub defaults: Defaults,
}

/// The Flipr cloud account.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    pub email: Option<String>,

    /// Plaintext password. Prefer the keyring or `password_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Polling {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_probe_cadence")]
    pub probe_cadence_secs: u64,

    #[serde(default = "default_hub_cadence")]
    pub hub_cadence_secs: u64,

    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            probe_cadence_secs: default_probe_cadence(),
            hub_cadence_secs: default_hub_cadence(),
            cycle_timeout_secs: default_cycle_timeout(),
            max_concurrent_fetches: default_max_concurrent(),
        }
    }
}

fn default_interval() -> u64 {
    flipr_core::config::DEFAULT_REFRESH_INTERVAL.as_secs()
}
fn default_probe_cadence() -> u64 {
    flipr_core::config::DEFAULT_PROBE_CADENCE.as_secs()
}
fn default_hub_cadence() -> u64 {
    flipr_core::config::DEFAULT_HUB_CADENCE.as_secs()
}
fn default_cycle_timeout() -> u64 {
    flipr_core::config::DEFAULT_CYCLE_TIMEOUT.as_secs()
}
fn default_max_concurrent() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "flipr", "flipr").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("flipr");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from the canonical file plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// `FLIPR_<SECTION>_<KEY>` overrides a file value, e.g.
/// `FLIPR_POLLING_INTERVAL_SECS=30` or `FLIPR_ACCOUNT_EMAIL=me@example.com`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLIPR_").map(|key| key.as_str().replacen('_', ".", 1).into()));

    Ok(figment.extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(email: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, &format!("{email}/password"))?)
}

/// Store a password in the system keyring for `email`.
pub fn store_password(email: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(email)?.set_password(password)?;
    Ok(())
}

impl Account {
    /// The configured email, or `override_email` when given.
    pub fn email<'a>(&'a self, override_email: Option<&'a str>) -> Result<&'a str, ConfigError> {
        override_email
            .or(self.email.as_deref())
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::NoEmail)
    }

    /// Resolve the password for `email`.
    ///
    /// Order: `password_env` variable, `FLIPR_PASSWORD`, system keyring,
    /// plaintext `password`.
    pub fn resolve_password(&self, email: &str) -> Result<SecretString, ConfigError> {
        let env_names = self.password_env.as_deref().into_iter().chain([PASSWORD_ENV]);
        for name in env_names {
            if let Ok(val) = std::env::var(name) {
                if !val.is_empty() {
                    debug!(source = name, "password from environment");
                    return Ok(SecretString::from(val));
                }
            }
        }

        if let Ok(entry) = keyring_entry(email) {
            if let Ok(pw) = entry.get_password() {
                debug!("password from keyring");
                return Ok(SecretString::from(pw));
            }
        }

        if let Some(ref pw) = self.password {
            return Ok(SecretString::from(pw.clone()));
        }

        Err(ConfigError::NoPassword {
            email: email.into(),
        })
    }
}

impl Config {
    /// Build API credentials. `override_email` takes precedence over the file.
    pub fn credentials(&self, override_email: Option<&str>) -> Result<Credentials, ConfigError> {
        let email = self.account.email(override_email)?;
        let password = self.account.resolve_password(email)?;
        Ok(Credentials::new(email, password))
    }

    /// Validate `[polling]` and translate it for the coordinator.
    pub fn to_coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        let p = &self.polling;
        for (field, value) in [
            ("polling.interval_secs", p.interval_secs),
            ("polling.cycle_timeout_secs", p.cycle_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        if p.max_concurrent_fetches == 0 {
            return Err(ConfigError::Validation {
                field: "polling.max_concurrent_fetches".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(CoordinatorConfig {
            refresh_interval: Duration::from_secs(p.interval_secs),
            probe_cadence: Duration::from_secs(p.probe_cadence_secs),
            hub_cadence: Duration::from_secs(p.hub_cadence_secs),
            cycle_timeout: Duration::from_secs(p.cycle_timeout_secs),
            max_concurrent_fetches: p.max_concurrent_fetches,
            ..CoordinatorConfig::default()
        })
    }
}
