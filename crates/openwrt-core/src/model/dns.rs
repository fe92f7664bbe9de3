// ── DNS domain types ──
//
// `DnsRecordSpec` is the loose declarative input (UCI field names, free-form
// type tag). `DnsRecord` is the validated form the reconciler works with.
// On the device, A records live in `dhcp` sections of type `domain`, CNAME
// records in sections of type `cname`.

use std::fmt;

use openwrt_api::UciSection;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// UCI section type holding A records.
pub const SECTION_DOMAIN: &str = "domain";
/// UCI section type holding CNAME records.
pub const SECTION_CNAME: &str = "cname";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsRecordType {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "CNAME")]
    Cname,
}

impl DnsRecordType {
    /// Parse a type tag. Only all-upper or all-lower case is accepted.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "A" | "a" => Some(Self::A),
            "CNAME" | "cname" => Some(Self::Cname),
            _ => None,
        }
    }

    /// The UCI section type this record type is stored as.
    pub fn section_type(self) -> &'static str {
        match self {
            Self::A => SECTION_DOMAIN,
            Self::Cname => SECTION_CNAME,
        }
    }

    /// Map a UCI section type back to a record type. Unknown section types
    /// are not DNS records.
    pub fn from_section_type(section_type: &str) -> Option<Self> {
        match section_type {
            SECTION_DOMAIN => Some(Self::A),
            SECTION_CNAME => Some(Self::Cname),
            _ => None,
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::Cname => "CNAME",
        })
    }
}

/// A validated DNS record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DnsRecord {
    #[serde(rename = "A")]
    A { name: String, ip: String },
    #[serde(rename = "CNAME")]
    Cname { cname: String, target: String },
}

/// What a record is matched by: its type plus `name` (A) or `cname` (CNAME).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsKey {
    pub record_type: DnsRecordType,
    pub identity: String,
}

impl DnsRecord {
    pub fn a(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self::A {
            name: name.into(),
            ip: ip.into(),
        }
    }

    pub fn cname(cname: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Cname {
            cname: cname.into(),
            target: target.into(),
        }
    }

    pub fn record_type(&self) -> DnsRecordType {
        match self {
            Self::A { .. } => DnsRecordType::A,
            Self::Cname { .. } => DnsRecordType::Cname,
        }
    }

    pub fn key(&self) -> DnsKey {
        let identity = match self {
            Self::A { name, .. } => name,
            Self::Cname { cname, .. } => cname,
        };
        DnsKey {
            record_type: self.record_type(),
            identity: identity.clone(),
        }
    }

    /// UCI options in the order they are written: identity first.
    pub fn options(&self) -> [(&'static str, &str); 2] {
        match self {
            Self::A { name, ip } => [("name", name.as_str()), ("ip", ip.as_str())],
            Self::Cname { cname, target } => {
                [("cname", cname.as_str()), ("target", target.as_str())]
            }
        }
    }

    /// Read a record from a `dhcp` section. Sections of any other type
    /// yield `None`; missing options read as empty strings.
    pub fn from_section(section: &UciSection) -> Option<Self> {
        match DnsRecordType::from_section_type(&section.section_type)? {
            DnsRecordType::A => Some(Self::A {
                name: section.option_or_empty("name"),
                ip: section.option_or_empty("ip"),
            }),
            DnsRecordType::Cname => Some(Self::Cname {
                cname: section.option_or_empty("cname"),
                target: section.option_or_empty("target"),
            }),
        }
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A { name, ip } => write!(f, "A {name} -> {ip}"),
            Self::Cname { cname, target } => write!(f, "CNAME {cname} -> {target}"),
        }
    }
}

/// Declarative DNS record input, as written by users.
///
/// Mirrors the UCI field names. Nothing is checked until the record is
/// validated; empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordSpec {
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl DnsRecordSpec {
    pub fn a(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            record_type: "A".into(),
            name: Some(name.into()),
            ip: Some(ip.into()),
            ..Self::default()
        }
    }

    pub fn cname(cname: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            record_type: "CNAME".into(),
            cname: Some(cname.into()),
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Check the type tag and every field the record type requires.
    pub fn validate(&self) -> Result<DnsRecord, CoreError> {
        match self.parse_type()? {
            DnsRecordType::A => Ok(DnsRecord::A {
                name: required("name", self.name.as_deref())?,
                ip: required("ip", self.ip.as_deref())?,
            }),
            DnsRecordType::Cname => Ok(DnsRecord::Cname {
                cname: required("cname", self.cname.as_deref())?,
                target: required("target", self.target.as_deref())?,
            }),
        }
    }

    /// Check only what is needed to find the record on the device.
    pub fn key(&self) -> Result<DnsKey, CoreError> {
        let record_type = self.parse_type()?;
        let identity = match record_type {
            DnsRecordType::A => required("name", self.name.as_deref())?,
            DnsRecordType::Cname => required("cname", self.cname.as_deref())?,
        };
        Ok(DnsKey {
            record_type,
            identity,
        })
    }

    fn parse_type(&self) -> Result<DnsRecordType, CoreError> {
        DnsRecordType::parse(&self.record_type).ok_or_else(|| CoreError::InvalidType {
            record_type: self.record_type.clone(),
        })
    }
}

fn required(field: &'static str, value: Option<&str>) -> Result<String, CoreError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_owned()),
        _ => Err(CoreError::Validation { field }),
    }
}

impl From<DnsRecord> for DnsRecordSpec {
    fn from(record: DnsRecord) -> Self {
        match record {
            DnsRecord::A { name, ip } => Self::a(name, ip),
            DnsRecord::Cname { cname, target } => Self::cname(cname, target),
        }
    }
}

impl fmt::Display for DnsRecordSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.record_type)?;
        let fields = [
            ("name", &self.name),
            ("ip", &self.ip),
            ("cname", &self.cname),
            ("target", &self.target),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                write!(f, " {key}={value}")?;
            }
        }
        Ok(())
    }
}
