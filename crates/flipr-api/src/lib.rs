// flipr-api: Async Rust client for the Flipr cloud API (analysers + Hub)

pub mod auth;
pub mod client;
pub mod error;
pub mod hub;
pub mod measures;
pub mod models;
pub mod modules;
pub mod transport;

pub use auth::Credentials;
pub use client::{DEFAULT_BASE_URL, FliprClient};
pub use error::Error;
pub use models::{DiscoveredIds, HubStatus, PoolMeasure};
pub use transport::TransportConfig;
