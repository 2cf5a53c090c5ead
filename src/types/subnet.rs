//! Subnet expansion.
//!
//! A CIDR is reduced to its network and broadcast boundaries with bytewise
//! mask arithmetic, then every address in between is produced in ascending
//! order. Network and broadcast addresses are included.

use crate::error::{TargetError, TargetResult};
use crate::types::address::{AddressFamily, AddressRange};
use crate::types::target::parse_cidr;
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Compute the inclusive address range covered by a network.
pub fn network_range(network: &IpNetwork) -> TargetResult<AddressRange> {
    let base = octets(&network.ip());
    let mask = octets(&network.mask());
    let family = AddressFamily::of(&network.ip());

    let lower: Vec<u8> = base.iter().zip(&mask).map(|(b, m)| b & m).collect();
    let upper: Vec<u8> = lower.iter().zip(&mask).map(|(n, m)| n | !m).collect();

    let network_addr = from_octets(&lower, family)
        .ok_or_else(|| TargetError::InvalidCidr(network.to_string()))?;
    let broadcast_addr = from_octets(&upper, family)
        .ok_or_else(|| TargetError::InvalidCidr(network.to_string()))?;

    AddressRange::new(network_addr, broadcast_addr)
}

/// Compute the inclusive address range of an IPv4 CIDR string.
pub fn subnet_range(cidr: &str) -> TargetResult<AddressRange> {
    let (base, prefix) =
        parse_cidr(cidr).ok_or_else(|| TargetError::InvalidCidr(cidr.to_string()))?;

    let network = IpNetwork::new(IpAddr::V4(base), prefix)
        .map_err(|e| TargetError::InvalidCidr(format!("{}: {}", cidr, e)))?;

    network_range(&network)
}

/// Expand an IPv4 CIDR string into every address it covers.
///
/// The result holds exactly `2^(32 - mask)` addresses, starting at the
/// network address and ending at the broadcast address.
pub fn expand(cidr: &str) -> TargetResult<Vec<IpAddr>> {
    Ok(subnet_range(cidr)?.iter().collect())
}

fn octets(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(addr) => addr.octets().to_vec(),
        IpAddr::V6(addr) => addr.octets().to_vec(),
    }
}

fn from_octets(bytes: &[u8], family: AddressFamily) -> Option<IpAddr> {
    match family {
        AddressFamily::V4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        AddressFamily::V6 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::target::{classify, TargetKind};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_expand_slash_30() {
        let ips = expand("10.0.0.0/30").unwrap();
        assert_eq!(
            ips,
            vec![ip("10.0.0.0"), ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3")]
        );
    }

    #[test]
    fn test_expand_slash_32() {
        assert_eq!(expand("172.16.5.4/32").unwrap(), vec![ip("172.16.5.4")]);
    }

    #[test]
    fn test_unaligned_base_is_masked() {
        let range = subnet_range("10.0.0.77/29").unwrap();
        assert_eq!(range.network(), ip("10.0.0.72"));
        assert_eq!(range.broadcast(), ip("10.0.0.79"));
    }

    #[test]
    fn test_expansion_size_matches_mask() {
        for mask in 16u32..=32 {
            let cidr = format!("192.168.200.9/{}", mask);
            let range = subnet_range(&cidr).unwrap();
            let ips = expand(&cidr).unwrap();

            assert_eq!(ips.len(), 1usize << (32 - mask), "{}", cidr);
            assert_eq!(ips.first(), Some(&range.network()));
            assert_eq!(ips.last(), Some(&range.broadcast()));
        }
    }

    #[test]
    fn test_whole_space_counts_without_enumerating() {
        let range = subnet_range("0.0.0.0/0").unwrap();
        assert_eq!(range.network(), ip("0.0.0.0"));
        assert_eq!(range.broadcast(), ip("255.255.255.255"));
        assert_eq!(range.host_count(), Some(1u128 << 32));
    }

    #[test]
    fn test_expanded_addresses_reclassify_as_ip() {
        for addr in expand("192.0.2.0/24").unwrap() {
            assert_eq!(classify(&addr.to_string()), TargetKind::IpAddress);
        }
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(matches!(expand("10.0.0.0/33"), Err(TargetError::InvalidCidr(_))));
        assert!(matches!(expand("10.0.0.0"), Err(TargetError::InvalidCidr(_))));
        assert!(matches!(expand("example.com/24"), Err(TargetError::InvalidCidr(_))));
    }

    #[test]
    fn test_ipv6_network_range() {
        let network: IpNetwork = "2001:db8::5/126".parse().unwrap();
        let range = network_range(&network).unwrap();
        let ips: Vec<IpAddr> = range.iter().collect();
        assert_eq!(ips.len(), 4);
        assert_eq!(ips[0], ip("2001:db8::4"));
        assert_eq!(ips[3], ip("2001:db8::7"));
    }
}
