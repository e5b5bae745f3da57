//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use flipr_config::ConfigError;
use flipr_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Flipr cloud at {url}")]
    #[diagnostic(
        code(flipr::connection_failed),
        help("Check your network connection. Details: {reason}")
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(flipr::auth_failed),
        help(
            "Verify the email and password of your Flipr account.\n\
             Run: flipr config init"
        )
    )]
    AuthFailed { message: String },

    #[error("No Flipr account email configured")]
    #[diagnostic(
        code(flipr::no_email),
        help(
            "Configure an account with: flipr config init\n\
             Or pass --email / set FLIPR_EMAIL.\n\
             Config file: {path}"
        )
    )]
    NoEmail { path: String },

    #[error("No password found for '{email}'")]
    #[diagnostic(
        code(flipr::no_password),
        help(
            "Store one with: flipr config init\n\
             Or set FLIPR_PASSWORD."
        )
    )]
    NoPassword { email: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(flipr::not_found),
        help("Run: flipr devices to see discovered analysers and Hubs")
    )]
    NotFound { identifier: String },

    #[error("Device '{identifier}' is not a {expected}")]
    #[diagnostic(code(flipr::wrong_kind), help("Run: flipr devices --kind {kind_flag}"))]
    WrongKind {
        identifier: String,
        expected: String,
        kind_flag: String,
    },

    #[error("The Hub did not apply the command: {message}")]
    #[diagnostic(
        code(flipr::rejected),
        help("The Hub may be in planning mode or offline. Check it in the Flipr app.")
    )]
    Rejected { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(flipr::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(flipr::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(flipr::config),
        help("Check the config file at {path}")
    )]
    Config { message: String, path: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(flipr::timeout),
        help("Increase the timeout with --timeout or polling.cycle_timeout_secs.")
    )]
    Timeout { seconds: u64 },

    #[error("The coordinator stopped before the command completed")]
    #[diagnostic(code(flipr::stopped))]
    Stopped,

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(flipr::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(flipr::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoEmail { .. } | Self::NoPassword { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. }
            | Self::ApiError {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::WrongKind { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SetupFailed { source } | CoreError::UpdateFailed { source } => {
                Self::from(*source)
            }

            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::CoordinatorStopped => Self::Stopped,

            CoreError::DeviceNotFound { identifier } => Self::NotFound { identifier },

            CoreError::NotAHub { identifier } => Self::WrongKind {
                identifier,
                expected: "Hub".into(),
                kind_flag: "hub".into(),
            },

            CoreError::Rejected { message } => Self::Rejected { message },

            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, status } => Self::ApiError { message, status },

            CoreError::DuplicateDevice { identifier } => Self::ApiError {
                message: format!("device {identifier} reported twice by the Flipr cloud"),
                status: None,
            },

            CoreError::Config { message } => Self::Config {
                message,
                path: flipr_config::config_path().display().to_string(),
            },

            CoreError::Internal(message) => Self::ApiError {
                message,
                status: None,
            },
        }
    }
}

impl From<flipr_api::Error> for CliError {
    fn from(err: flipr_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let path = flipr_config::config_path().display().to_string();
        match err {
            ConfigError::NoEmail => Self::NoEmail { path },
            ConfigError::NoPassword { email } => Self::NoPassword { email },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
                path,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failure_maps_to_root_cause() {
        let err = CoreError::SetupFailed {
            source: Box::new(CoreError::AuthenticationFailed {
                message: "bad password".into(),
            }),
        };
        let cli = CliError::from(err);
        assert!(matches!(cli, CliError::AuthFailed { .. }));
        assert_eq!(cli.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn precondition_errors_have_distinct_codes() {
        let missing = CliError::from(CoreError::DeviceNotFound {
            identifier: "X".into(),
        });
        let wrong = CliError::from(CoreError::NotAHub {
            identifier: "P1".into(),
        });
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(wrong.exit_code(), exit_code::USAGE);
    }
}
