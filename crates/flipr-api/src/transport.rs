// Shared transport configuration for building reqwest::Client instances.
//
// Every Flipr client built by the CLI and the coordinator goes through
// this module so timeout and user-agent settings stay in one place.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("flipr-rs/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout. The Flipr cloud is slow to answer survey
    /// requests, so the default is generous.
    pub timeout: Duration,
    /// Overrides the system proxy settings when set.
    pub no_proxy: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            no_proxy: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        builder.build().map_err(Error::Transport)
    }

    /// Same config with a different per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
