// ── Core error types ──
//
// Errors surfaced by the coordinator and entity layer. Consumers never see
// HTTP status codes or JSON parse failures directly: the
// `From<flipr_api::Error>` impl translates them at the cycle and command
// boundaries.
//
// `CoreError` is `Clone` because one refresh outcome is shared by every
// caller that joined the same in-flight cycle.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Flipr cloud at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Lifecycle errors ─────────────────────────────────────────────
    /// The mandatory first refresh failed; the coordinator never became ready.
    #[error("Setup failed: {source}")]
    SetupFailed {
        #[source]
        source: Box<CoreError>,
    },

    /// A refresh cycle failed after setup. The previous snapshot is kept.
    #[error("Update failed: {source}")]
    UpdateFailed {
        #[source]
        source: Box<CoreError>,
    },

    #[error("Coordinator stopped")]
    CoordinatorStopped,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device {identifier} is not a Hub")]
    NotAHub { identifier: String },

    #[error("Device id {identifier} reported more than once")]
    DuplicateDevice { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by the Hub: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for commands issued against an id that is absent from the
    /// snapshot or of the wrong kind. No upstream call was made.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. } | Self::NotAHub { .. })
    }

    /// The innermost cause, looking through setup/update wrappers.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::SetupFailed { source } | Self::UpdateFailed { source } => source.root_cause(),
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<flipr_api::Error> for CoreError {
    fn from(err: flipr_api::Error) -> Self {
        match err {
            flipr_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            flipr_api::Error::TokenExpired => CoreError::AuthenticationFailed {
                message: "Access token expired -- re-authentication required".into(),
            },
            flipr_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            flipr_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            flipr_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            flipr_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            flipr_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
