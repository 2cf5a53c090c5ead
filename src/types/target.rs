//! Target classification.
//!
//! Free-form input strings are sorted into exactly one [`TargetKind`]:
//! - Domains (`example.com`) and wildcard domains (`*.example.com`)
//! - Dotted-quad IPv4 addresses (`192.168.1.1`)
//! - IPv4 CIDR subnets (`192.168.1.0/24`)
//!
//! Patterns are checked in that order and the first match wins, so a string
//! that looks like both a domain and something else is always a domain.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock;

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$").expect("domain pattern compiles")
});

static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,3}\.){3}[0-9]{1,3}$").expect("ipv4 pattern compiles")
});

static SUBNET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,3}\.){3}[0-9]{1,3}/[0-9]{1,2}$").expect("subnet pattern compiles")
});

const WILDCARD_PREFIX: &str = "*.";

/// Kind assigned to a raw input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A plain domain name.
    Domain,
    /// A domain prefixed with `*.`, expanded through subdomain discovery.
    WildcardDomain,
    /// A dotted-quad IPv4 address with every group in range.
    IpAddress,
    /// An IPv4 CIDR subnet with a valid base address and mask.
    Subnet,
    /// Anything else, including IP-shaped strings with out-of-range groups.
    Invalid,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain => write!(f, "domain"),
            Self::WildcardDomain => write!(f, "wildcard domain"),
            Self::IpAddress => write!(f, "IP address"),
            Self::Subnet => write!(f, "subnet"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Classify a raw input string.
///
/// Pure and total: every input maps to a kind, `Invalid` included.
pub fn classify(input: &str) -> TargetKind {
    if DOMAIN_PATTERN.is_match(input) {
        return if input.starts_with(WILDCARD_PREFIX) {
            TargetKind::WildcardDomain
        } else {
            TargetKind::Domain
        };
    }

    if IPV4_PATTERN.is_match(input) {
        return match parse_ipv4(input) {
            Some(_) => TargetKind::IpAddress,
            None => TargetKind::Invalid,
        };
    }

    if SUBNET_PATTERN.is_match(input) {
        return match parse_cidr(input) {
            Some(_) => TargetKind::Subnet,
            None => TargetKind::Invalid,
        };
    }

    TargetKind::Invalid
}

/// Strip the wildcard prefix from a wildcard domain, yielding its apex.
pub fn apex_domain(input: &str) -> Option<&str> {
    input
        .strip_prefix(WILDCARD_PREFIX)
        .filter(|apex| !apex.is_empty())
}

/// Parse a dotted quad whose four groups are decimal integers in [0, 255].
///
/// Leading zeros are accepted (`010.0.0.1` is `10.0.0.1`).
pub fn parse_ipv4(input: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut groups = input.split('.');

    for octet in octets.iter_mut() {
        *octet = parse_decimal(groups.next()?)?
            .try_into()
            .ok()?;
    }

    if groups.next().is_some() {
        return None;
    }

    Some(Ipv4Addr::from(octets))
}

/// Parse `a.b.c.d/m` into a base address and a mask in [0, 32].
pub fn parse_cidr(input: &str) -> Option<(Ipv4Addr, u8)> {
    let (address, mask) = input.split_once('/')?;
    let address = parse_ipv4(address)?;
    let mask = parse_decimal(mask)?;
    if mask > 32 {
        return None;
    }
    Some((address, mask as u8))
}

fn parse_decimal(group: &str) -> Option<u32> {
    if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    group.parse().ok()
}

/// Kind of a persisted target. Only domains and IP addresses are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "IP address")]
    IpAddress,
}

impl TargetType {
    /// Stored and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::IpAddress => "IP address",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(Self::Domain),
            "IP address" => Ok(Self::IpAddress),
            other => Err(format!("unknown target type: {}", other)),
        }
    }
}

/// A concrete scan target: a `(type, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Domain or IP address.
    #[serde(rename = "type")]
    pub kind: TargetType,
    /// Domain name or dotted-quad address, as submitted.
    pub value: String,
}

impl TargetRecord {
    /// Create a new target record.
    pub fn new(kind: TargetType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// A domain target.
    pub fn domain(value: impl Into<String>) -> Self {
        Self::new(TargetType::Domain, value)
    }

    /// An IP address target.
    pub fn ip(value: impl Into<String>) -> Self {
        Self::new(TargetType::IpAddress, value)
    }
}

impl fmt::Display for TargetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.kind)
    }
}
