// ── Domain model ──
//
// Typed views over UCI sections. Snapshots are keyed by the device's
// opaque section handle.

pub mod dns;
pub mod pbr;

pub use dns::{DnsKey, DnsRecord, DnsRecordSpec, DnsRecordType};
pub use pbr::PbrPolicy;
