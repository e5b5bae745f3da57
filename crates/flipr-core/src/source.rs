// ── Upstream device source ──
//
// The coordinator treats the Flipr cloud as an opaque RPC surface. This
// port trait lets it run against the real client or a test double.

use std::future::Future;

use flipr_api::FliprClient;
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{HubMode, HubState, ProbeMeasure};

/// Module ids partitioned by kind, in upstream order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub probes: Vec<String>,
    pub hubs: Vec<String>,
}

/// RPC surface the coordinator polls and commands.
///
/// Implementations must be safe for concurrent use: one cycle issues
/// several fetches at once and commands may run alongside it.
pub trait DeviceSource: Send + Sync + 'static {
    /// List every analyser and Hub on the account.
    fn discover(&self) -> impl Future<Output = Result<Discovery, CoreError>> + Send;

    /// Latest measure of one analyser.
    fn fetch_probe(&self, id: &str) -> impl Future<Output = Result<ProbeMeasure, CoreError>> + Send;

    /// Current state of one Hub.
    fn fetch_hub(&self, id: &str) -> impl Future<Output = Result<HubState, CoreError>> + Send;

    /// Switch a Hub relay; returns the state the Hub reports afterwards.
    fn set_hub_state(
        &self,
        id: &str,
        on: bool,
    ) -> impl Future<Output = Result<HubState, CoreError>> + Send;

    /// Change a Hub mode; returns the state the Hub reports afterwards.
    fn set_hub_mode(
        &self,
        id: &str,
        mode: HubMode,
    ) -> impl Future<Output = Result<HubState, CoreError>> + Send;
}

impl DeviceSource for FliprClient {
    async fn discover(&self) -> Result<Discovery, CoreError> {
        Ok(self.search_all_ids().await?.into())
    }

    async fn fetch_probe(&self, id: &str) -> Result<ProbeMeasure, CoreError> {
        Ok(self.get_pool_measure_latest(id).await?.into())
    }

    async fn fetch_hub(&self, id: &str) -> Result<HubState, CoreError> {
        self.get_hub_state(id).await?.try_into()
    }

    async fn set_hub_state(&self, id: &str, on: bool) -> Result<HubState, CoreError> {
        FliprClient::set_hub_state(self, id, on).await?.try_into()
    }

    async fn set_hub_mode(&self, id: &str, mode: HubMode) -> Result<HubState, CoreError> {
        FliprClient::set_hub_mode(self, id, mode.as_ref()).await?.try_into()
    }
}
