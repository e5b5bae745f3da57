// Module discovery
//
// The account's analysers and Hubs share one listing endpoint and are told
// apart by `ModuleType_Id`.

use tracing::debug;

use crate::client::FliprClient;
use crate::error::Error;
use crate::models::{DiscoveredIds, MODULE_TYPE_FLIPR, MODULE_TYPE_HUB, Module};

impl FliprClient {
    /// List every module registered on the account.
    ///
    /// `GET /modules`
    pub async fn list_modules(&self) -> Result<Vec<Module>, Error> {
        self.get("/modules").await
    }

    /// Discover analyser and Hub serials.
    ///
    /// Modules of unknown type are skipped.
    pub async fn search_all_ids(&self) -> Result<DiscoveredIds, Error> {
        let modules = self.list_modules().await?;
        let mut ids = DiscoveredIds::default();

        for module in modules {
            match module.module_type_id {
                MODULE_TYPE_FLIPR => ids.flipr.push(module.serial),
                MODULE_TYPE_HUB => ids.hub.push(module.serial),
                other => debug!(serial = %module.serial, module_type = other, "skipping module"),
            }
        }

        debug!(flipr = ids.flipr.len(), hub = ids.hub.len(), "discovered modules");
        Ok(ids)
    }
}
