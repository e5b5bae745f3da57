// Analyser survey endpoints

use tracing::debug;

use crate::client::FliprClient;
use crate::error::Error;
use crate::models::{PoolMeasure, SurveyResponse};

impl FliprClient {
    /// Latest water measure taken by an analyser.
    ///
    /// `GET /modules/{serial}/survey/last`
    pub async fn get_pool_measure_latest(&self, flipr_id: &str) -> Result<PoolMeasure, Error> {
        debug!(flipr_id, "fetching latest pool measure");
        let raw: SurveyResponse = self.get(&format!("/modules/{flipr_id}/survey/last")).await?;
        Ok(raw.into())
    }
}
