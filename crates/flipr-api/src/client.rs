// Flipr cloud HTTP client
//
// Wraps `reqwest::Client` with bearer-token management, URL construction,
// and status/body handling. Endpoint groups (modules, measures, hub) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Production endpoint of the Flipr cloud API.
pub const DEFAULT_BASE_URL: &str = "https://apis.goflipr.com";

/// HTTP client for the Flipr cloud API.
///
/// Safe to share across tasks: the underlying `reqwest::Client` is
/// connection-pooled and the cached token sits behind an async mutex, so
/// concurrent requests never authenticate twice for the same expiry.
pub struct FliprClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    token: Mutex<Option<SecretString>>,
    timeout_secs: u64,
}

impl FliprClient {
    /// Create a client against the production API.
    pub fn new(credentials: Credentials, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(DEFAULT_BASE_URL)?;
        Self::with_base_url(base_url, credentials, transport)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
            token: Mutex::new(None),
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Mostly useful for pointing the client at a mock server.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            credentials,
            token: Mutex::new(None),
            timeout_secs: TransportConfig::default().timeout.as_secs(),
        })
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account this client authenticates as.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // ── Token cache ──────────────────────────────────────────────────

    /// Return the cached token, authenticating first if there is none.
    async fn bearer(&self) -> Result<SecretString, Error> {
        let mut guard = self.token.lock().await;
        if let Some(ref token) = *guard {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Forget the cached token.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build a full URL for an API path.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::POST, path).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::PUT, path).await
    }

    /// Send an authenticated request, re-authenticating once on 401.
    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("{} {}", method, url);

        let token = self.bearer().await?;
        let resp = self.dispatch(method.clone(), url.clone(), &token).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return self.parse_body(resp).await;
        }

        debug!("access token rejected, re-authenticating");
        self.invalidate_token().await;
        let token = self.bearer().await?;
        let resp = self.dispatch(method, url, &token).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::TokenExpired);
        }
        self.parse_body(resp).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        token: &SecretString,
    ) -> Result<reqwest::Response, Error> {
        self.http
            .request(method, url)
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_transport(e))
    }

    /// Check the status and decode the JSON body.
    async fn parse_body<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.canonical_reason().unwrap_or("unknown").to_owned()
                } else {
                    body
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    pub(crate) fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}

impl std::fmt::Debug for FliprClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FliprClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}
