// DNS reconciliation
//
// Declarative A/CNAME record sets are mapped onto `dhcp` config sections.
// Update and delete plan every change against a snapshot first, so an
// unmatched record fails the batch before anything is touched.

use indexmap::IndexMap;
use openwrt_api::UciClient;
use tracing::debug;

use crate::batch::{Batch, BatchReport, Mutation};
use crate::error::CoreError;
use crate::model::{DnsKey, DnsRecord, DnsRecordSpec};
use crate::openwrt::OpenWrt;

/// The UCI config holding DNS records.
pub const DHCP_CONFIG: &str = "dhcp";

impl<C: UciClient> OpenWrt<C> {
    /// Read every A and CNAME record on the device, keyed by section handle.
    ///
    /// `domain` sections become A records, `cname` sections CNAME records;
    /// all other `dhcp` sections are ignored.
    pub async fn get_dns_records(&self) -> Result<IndexMap<String, DnsRecord>, CoreError> {
        let sections = self.client().get_all(DHCP_CONFIG).await?;
        Ok(sections
            .into_iter()
            .filter_map(|(handle, section)| {
                DnsRecord::from_section(&section).map(|record| (handle, record))
            })
            .collect())
    }

    /// Create new records and commit them as one batch.
    ///
    /// Every record is validated before the first RPC. Records are not
    /// deduplicated: creating the same record twice yields two sections.
    pub async fn set_dns_records(
        &self,
        records: &[DnsRecordSpec],
    ) -> Result<BatchReport, CoreError> {
        let desired = validate_all(records)?;
        debug!(count = desired.len(), "creating DNS records");

        let mut batch = Batch::new(DHCP_CONFIG);
        let plan = desired.iter().map(create).collect();
        batch.apply(self.client(), plan).await
    }

    /// Replace existing records with new values.
    ///
    /// A records are found by `name`, CNAME records by `cname`. Each match
    /// is deleted and re-created. If any record has no match, the batch
    /// fails with [`CoreError::NotFound`] and nothing is changed.
    pub async fn update_dns_records(
        &self,
        records: &[DnsRecordSpec],
    ) -> Result<BatchReport, CoreError> {
        let desired = validate_all(records)?;
        let pending = records
            .iter()
            .zip(desired)
            .map(|(spec, record)| Pending {
                spec,
                key: record.key(),
                value: record,
            })
            .collect();

        let mut batch = Batch::new(DHCP_CONFIG);
        let current = batch.fetch(self.get_dns_records()).await?;
        let plan = batch.check(plan_update(&current, pending))?;
        debug!(steps = plan.len(), "updating DNS records");
        batch.apply(self.client(), plan).await
    }

    /// Delete records.
    ///
    /// Matching works as in [`update_dns_records`](Self::update_dns_records);
    /// only the identity field is required. Any unmatched record fails the
    /// batch before a delete is sent. An empty list still commits.
    pub async fn delete_dns_records(
        &self,
        records: &[DnsRecordSpec],
    ) -> Result<BatchReport, CoreError> {
        let pending = records
            .iter()
            .map(|spec| {
                Ok(Pending {
                    spec,
                    key: spec.key()?,
                    value: (),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        let mut batch = Batch::new(DHCP_CONFIG);
        let current = batch.fetch(self.get_dns_records()).await?;
        let plan = batch.check(plan_delete(&current, pending))?;
        debug!(steps = plan.len(), "deleting DNS records");
        batch.apply(self.client(), plan).await
    }
}

/// A requested record waiting for a match in the snapshot.
#[derive(Debug)]
pub(crate) struct Pending<'a, T> {
    spec: &'a DnsRecordSpec,
    key: DnsKey,
    value: T,
}

fn validate_all(records: &[DnsRecordSpec]) -> Result<Vec<DnsRecord>, CoreError> {
    records.iter().map(DnsRecordSpec::validate).collect()
}

fn create(record: &DnsRecord) -> Mutation {
    Mutation::Add {
        section_type: record.record_type().section_type(),
        options: record
            .options()
            .into_iter()
            .map(|(option, value)| (option, value.to_owned()))
            .collect(),
    }
}

/// Pair snapshot entries with pending records.
///
/// Walks the snapshot in order; each entry claims at most one pending
/// record, the first with the same key. Pending records left over are
/// reported as not found.
fn claim<T>(
    current: &IndexMap<String, DnsRecord>,
    mut pending: Vec<Pending<'_, T>>,
) -> Result<Vec<(String, T)>, CoreError> {
    let mut matched = Vec::with_capacity(pending.len());
    for (handle, record) in current {
        if pending.is_empty() {
            break;
        }
        let key = record.key();
        if let Some(pos) = pending.iter().position(|p| p.key == key) {
            matched.push((handle.clone(), pending.remove(pos).value));
        }
    }

    if !pending.is_empty() {
        return Err(CoreError::NotFound {
            records: pending.into_iter().map(|p| p.spec.clone()).collect(),
        });
    }
    Ok(matched)
}

fn plan_update(
    current: &IndexMap<String, DnsRecord>,
    pending: Vec<Pending<'_, DnsRecord>>,
) -> Result<Vec<Mutation>, CoreError> {
    let mut plan = Vec::new();
    for (handle, record) in claim(current, pending)? {
        plan.push(Mutation::Delete { handle });
        plan.push(create(&record));
    }
    Ok(plan)
}

fn plan_delete(
    current: &IndexMap<String, DnsRecord>,
    pending: Vec<Pending<'_, ()>>,
) -> Result<Vec<Mutation>, CoreError> {
    Ok(claim(current, pending)?
        .into_iter()
        .map(|(handle, ())| Mutation::Delete { handle })
        .collect())
}
