// ── Core error types ──
//
// Errors raised by reconciliation. Caller-side problems (validation, type
// tags, missing targets) are checked before anything is committed; device
// and protocol failures are carried unchanged from `openwrt-api`.

use thiserror::Error;

use crate::batch::BatchPhase;
use crate::model::DnsRecordSpec;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    /// A record is missing a field its type requires.
    #[error("{field} is required")]
    Validation { field: &'static str },

    /// The record type tag is neither A nor CNAME.
    #[error("invalid record type: {record_type}")]
    InvalidType { record_type: String },

    // ── Reconciliation errors ────────────────────────────────────────
    /// Some requested records do not exist on the device.
    #[error("records not found: [{}]", join_records(.records))]
    NotFound { records: Vec<DnsRecordSpec> },

    /// A batch was driven through an illegal phase change.
    #[error("invalid batch transition: {from:?} -> {to:?}")]
    InvalidTransition { from: BatchPhase, to: BatchPhase },

    // ── Device errors ────────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] openwrt_api::Error),
}

impl CoreError {
    /// Returns `true` if the error was raised before any RPC was issued.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidType { .. })
    }

    /// Returns `true` for [`CoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn join_records(records: &[DnsRecordSpec]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
