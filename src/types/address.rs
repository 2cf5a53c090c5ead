//! Ordinal arithmetic over IP addresses.
//!
//! Addresses are converted to unsigned big integers so that ranges of any
//! width (IPv4 or IPv6) can be enumerated without relying on machine-word
//! overflow behaviour.

use crate::error::{TargetError, TargetResult};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of an IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of the given address.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Width of an address of this family in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::V4 => 4,
            Self::V6 => 16,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Convert an address to its ordinal integer (big-endian byte value).
pub fn to_ordinal(ip: &IpAddr) -> BigUint {
    match ip {
        IpAddr::V4(addr) => BigUint::from_bytes_be(&addr.octets()),
        IpAddr::V6(addr) => BigUint::from_bytes_be(&addr.octets()),
    }
}

/// Convert an ordinal integer back to an address of the given family.
///
/// Returns `None` when the value does not fit in the family's width.
pub fn from_ordinal(value: &BigUint, family: AddressFamily) -> Option<IpAddr> {
    let bytes = value.to_bytes_be();
    let width = family.width();
    if bytes.len() > width {
        return None;
    }

    // Left-pad so that small values (including zero) keep the full width.
    let mut buf = vec![0u8; width];
    buf[width - bytes.len()..].copy_from_slice(&bytes);

    match family {
        AddressFamily::V4 => {
            let octets: [u8; 4] = buf.as_slice().try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        AddressFamily::V6 => {
            let octets: [u8; 16] = buf.as_slice().try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
    }
}

/// An inclusive range of addresses, typically a subnet's network and
/// broadcast boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    network: IpAddr,
    broadcast: IpAddr,
}

impl AddressRange {
    /// Create a range. Both ends must share a family and be ordered.
    pub fn new(network: IpAddr, broadcast: IpAddr) -> TargetResult<Self> {
        if AddressFamily::of(&network) != AddressFamily::of(&broadcast) {
            return Err(TargetError::FamilyMismatch {
                start: network.to_string(),
                end: broadcast.to_string(),
            });
        }
        if to_ordinal(&network) > to_ordinal(&broadcast) {
            return Err(TargetError::RangeOrder {
                start: network.to_string(),
                end: broadcast.to_string(),
            });
        }
        Ok(Self { network, broadcast })
    }

    /// First address of the range.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// Last address of the range.
    pub fn broadcast(&self) -> IpAddr {
        self.broadcast
    }

    /// Number of addresses in the range, both endpoints included.
    pub fn len(&self) -> BigUint {
        to_ordinal(&self.broadcast) - to_ordinal(&self.network) + BigUint::one()
    }

    /// A range always holds at least one address.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of addresses as a `u128`, if it fits.
    pub fn host_count(&self) -> Option<u128> {
        self.len().to_u128()
    }

    /// Iterate every address in ascending order.
    pub fn iter(&self) -> AddressIter {
        AddressIter {
            next: to_ordinal(&self.network),
            last: to_ordinal(&self.broadcast),
            family: AddressFamily::of(&self.network),
        }
    }
}

impl IntoIterator for &AddressRange {
    type Item = IpAddr;
    type IntoIter = AddressIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.network, self.broadcast)
    }
}

/// Ascending iterator over an [`AddressRange`].
#[derive(Debug, Clone)]
pub struct AddressIter {
    next: BigUint,
    last: BigUint,
    family: AddressFamily,
}

impl Iterator for AddressIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.last {
            return None;
        }
        let ip = from_ordinal(&self.next, self.family)?;
        self.next += 1u32;
        Some(ip)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.next > self.last {
            return (0, Some(0));
        }
        let remaining = (&self.last - &self.next + BigUint::one()).to_usize();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_ordinal_of_v4() {
        assert_eq!(to_ordinal(&v4("0.0.0.1")), BigUint::from(1u32));
        assert_eq!(to_ordinal(&v4("10.0.0.0")), BigUint::from(0x0A00_0000u32));
        assert_eq!(to_ordinal(&v4("255.255.255.255")), BigUint::from(u32::MAX));
    }

    #[test]
    fn test_zero_keeps_full_width() {
        let ip = from_ordinal(&BigUint::from(0u32), AddressFamily::V4).unwrap();
        assert_eq!(ip, v4("0.0.0.0"));

        let ip = from_ordinal(&BigUint::from(0u32), AddressFamily::V6).unwrap();
        assert_eq!(ip, "::".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_ordinal_overflow_is_rejected() {
        let too_big = BigUint::from(u32::MAX) + 1u32;
        assert!(from_ordinal(&too_big, AddressFamily::V4).is_none());
        assert!(from_ordinal(&too_big, AddressFamily::V6).is_some());
    }

    #[test]
    fn test_range_iterates_inclusive() {
        let range = AddressRange::new(v4("192.168.0.254"), v4("192.168.1.1")).unwrap();
        let ips: Vec<IpAddr> = range.iter().collect();
        assert_eq!(
            ips,
            vec![
                v4("192.168.0.254"),
                v4("192.168.0.255"),
                v4("192.168.1.0"),
                v4("192.168.1.1"),
            ]
        );
        assert_eq!(range.host_count(), Some(4));
    }

    #[test]
    fn test_single_address_range() {
        let range = AddressRange::new(v4("8.8.8.8"), v4("8.8.8.8")).unwrap();
        assert_eq!(range.iter().count(), 1);
        assert_eq!(range.iter().size_hint(), (1, Some(1)));
    }

    #[test]
    fn test_range_ends_at_top_of_space() {
        let range = AddressRange::new(v4("255.255.255.254"), v4("255.255.255.255")).unwrap();
        assert_eq!(range.iter().count(), 2);
    }

    #[test]
    fn test_ipv6_range_past_u64() {
        let range = AddressRange::new(
            "2001:db8::ffff:ffff:ffff:fffe".parse().unwrap(),
            "2001:db8::1:0:0:0:1".parse().unwrap(),
        )
        .unwrap();
        let ips: Vec<IpAddr> = range.iter().collect();
        assert_eq!(ips.len(), 4);
        assert_eq!(ips[2], "2001:db8::1:0:0:0:0".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = AddressRange::new(v4("10.0.0.2"), v4("10.0.0.1")).unwrap_err();
        assert!(matches!(err, TargetError::RangeOrder { .. }));
    }

    #[test]
    fn test_mixed_family_rejected() {
        let err = AddressRange::new(v4("10.0.0.1"), "::1".parse().unwrap()).unwrap_err();
        assert!(matches!(err, TargetError::FamilyMismatch { .. }));
    }
}
