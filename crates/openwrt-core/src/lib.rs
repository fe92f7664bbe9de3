//! Declarative DNS and policy-routing management for OpenWrt devices.
//!
//! Built on the LuCI JSON-RPC client in [`openwrt_api`]. [`OpenWrt`] reads
//! a fresh snapshot of the device for every operation, plans the UCI
//! changes needed, applies them in order and commits once per batch.
//!
//! ```no_run
//! # async fn demo(config: openwrt_api::SessionConfig) -> Result<(), openwrt_core::CoreError> {
//! use openwrt_core::{DnsRecordSpec, OpenWrt};
//!
//! let owrt = OpenWrt::connect(&config)?;
//! owrt.set_dns_records(&[DnsRecordSpec::a("nas.lan", "10.0.0.2")]).await?;
//! owrt.update_dns_records(&[DnsRecordSpec::a("nas.lan", "10.0.0.3")]).await?;
//! owrt.enable_pbr_policy("vpn-laptop", false).await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod dns;
pub mod error;
pub mod model;
pub mod openwrt;
pub mod pbr;

#[cfg(test)]
mod testing;

pub use batch::{Batch, BatchPhase, BatchReport, Mutation};
pub use dns::DHCP_CONFIG;
pub use error::CoreError;
pub use model::{DnsKey, DnsRecord, DnsRecordSpec, DnsRecordType, PbrPolicy};
pub use openwrt::OpenWrt;
pub use pbr::PBR_CONFIG;
