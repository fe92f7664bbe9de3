// ── OpenWrt facade ──
//
// Entry point for reconciliation. Holds the UCI client; the DNS and PBR
// operations live in `dns.rs` and `pbr.rs` as inherent methods.

use openwrt_api::{Session, SessionConfig, UciClient};

use crate::error::CoreError;

/// High-level client for declarative configuration on an OpenWrt device.
///
/// Every operation is stateless: multi-record operations read a fresh
/// snapshot of the device before planning their changes.
#[derive(Debug)]
pub struct OpenWrt<C = Session> {
    client: C,
}

impl OpenWrt<Session> {
    /// Open an HTTP session to the device described by `config`.
    ///
    /// No request is sent yet; the first operation logs in lazily.
    pub fn connect(config: &SessionConfig) -> Result<Self, CoreError> {
        Ok(Self::new(Session::from_config(config)?))
    }
}

impl<C: UciClient> OpenWrt<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The underlying UCI client.
    pub fn client(&self) -> &C {
        &self.client
    }
}
