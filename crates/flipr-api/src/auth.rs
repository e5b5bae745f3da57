// OAuth2 password-grant authentication
//
// The Flipr cloud issues bearer tokens from `/OAuth2/token`. The client
// acquires one lazily on the first request, caches it, and drops it when
// the API answers 401 so the next request re-authenticates.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::client::FliprClient;
use crate::error::Error;

/// Account credentials for the Flipr cloud.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Body of a successful `/OAuth2/token` response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl FliprClient {
    /// Request a fresh access token with the configured credentials.
    ///
    /// `POST /OAuth2/token` with a form-encoded password grant.
    pub async fn authenticate(&self) -> Result<SecretString, Error> {
        let url = self.base_url().join("/OAuth2/token")?;
        debug!("requesting access token at {}", url);

        let creds = self.credentials();
        let form = [
            ("grant_type", "password"),
            ("username", creds.username.as_str()),
            ("password", creds.password.expose_secret()),
        ];

        let resp = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {body}"),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if let Some(kind) = token.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(Error::Authentication {
                    message: format!("unexpected token type '{kind}'"),
                });
            }
        }

        debug!(expires_in = ?token.expires_in, "access token acquired");
        Ok(SecretString::from(token.access_token))
    }
}
