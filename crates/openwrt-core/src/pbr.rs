// Policy-based routing
//
// Reads `pbr` config sections and toggles policies by name.

use indexmap::IndexMap;
use openwrt_api::UciClient;
use tracing::{debug, warn};

use crate::batch::{Batch, Mutation};
use crate::error::CoreError;
use crate::model::PbrPolicy;
use crate::model::pbr::uci_bool;
use crate::openwrt::OpenWrt;

/// The UCI config holding routing policies.
pub const PBR_CONFIG: &str = "pbr";

impl<C: UciClient> OpenWrt<C> {
    /// Read every section of the `pbr` config, keyed by section handle.
    pub async fn get_pbr_policies(&self) -> Result<IndexMap<String, PbrPolicy>, CoreError> {
        let sections = self.client().get_all(PBR_CONFIG).await?;
        Ok(sections
            .iter()
            .map(|(handle, section)| (handle.clone(), PbrPolicy::from_section(section)))
            .collect())
    }

    /// Set `enabled` on every section whose `name` equals `name`.
    ///
    /// All matches are committed together. Returns the number of sections
    /// changed; with no match nothing is written or committed.
    pub async fn enable_pbr_policy(&self, name: &str, enabled: bool) -> Result<usize, CoreError> {
        let mut batch = Batch::new(PBR_CONFIG);
        let policies = batch.fetch(self.get_pbr_policies()).await?;

        let plan: Vec<Mutation> = policies
            .into_iter()
            .filter(|(_, policy)| policy.name.as_deref() == Some(name))
            .map(|(handle, _)| Mutation::Set {
                handle,
                option: "enabled",
                value: uci_bool(enabled).to_owned(),
            })
            .collect();

        if plan.is_empty() {
            warn!(policy = name, "no pbr policy with this name");
            batch.finish_unchanged()?;
            return Ok(0);
        }

        debug!(policy = name, enabled, matches = plan.len(), "toggling pbr policy");
        let report = batch.apply(self.client(), plan).await?;
        Ok(report.changed.len())
    }
}
