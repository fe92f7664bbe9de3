// ── Policy-based routing types ──

use openwrt_api::UciSection;

/// One section of the `pbr` config.
///
/// `get_all pbr` returns every section (globals, includes, policies);
/// `section_type` tells them apart. Only `policy` sections carry the
/// routing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PbrPolicy {
    pub section_type: String,
    pub name: Option<String>,
    pub src_addr: Option<String>,
    pub dest_addr: Option<String>,
    pub interface: Option<String>,
    /// `"0"` or `"1"`.
    pub enabled: Option<String>,
}

impl PbrPolicy {
    pub fn from_section(section: &UciSection) -> Self {
        let opt = |key: &str| section.option(key).map(str::to_owned);
        Self {
            section_type: section.section_type.clone(),
            name: opt("name"),
            src_addr: opt("src_addr"),
            dest_addr: opt("dest_addr"),
            interface: opt("interface"),
            enabled: opt("enabled"),
        }
    }

    /// pbr treats a policy without an `enabled` option as enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.as_deref() != Some("0")
    }
}

/// UCI encoding of a boolean option.
pub(crate) fn uci_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
