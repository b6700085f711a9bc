//! Conversion of delegated ranges into CIDR prefixes.
//!
//! IPv4 delegations are `(start, count)` pairs that need not be CIDR
//! aligned, so they are split into the minimal set of aligned blocks.
//! IPv6 delegations already carry a prefix length and pass through after
//! validation.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::record::{AddressFamily, PrefixRecord, RangeRecord};

/// Split `count` addresses starting at `start` into the minimal ordered set
/// of CIDR blocks covering exactly that range.
///
/// Returns `None` when `count` is zero or the range runs past
/// 255.255.255.255.
///
/// # Examples
/// ```
/// use deflect_geoip::aggregator::ipv4_range_to_cidrs;
/// let nets = ipv4_range_to_cidrs("10.0.0.0".parse().unwrap(), 768).unwrap();
/// let nets: Vec<String> = nets.iter().map(|n| n.to_string()).collect();
/// assert_eq!(nets, ["10.0.0.0/23", "10.0.2.0/24"]);
/// ```
pub fn ipv4_range_to_cidrs(start: Ipv4Addr, count: u64) -> Option<Vec<Ipv4Net>> {
    if count == 0 {
        return None;
    }
    let mut cur = u64::from(u32::from(start));
    let end = cur.checked_add(count - 1)?;
    if end > u64::from(u32::MAX) {
        return None;
    }

    let mut out = Vec::new();
    while cur <= end {
        // Grow from a single host while the next larger block stays
        // aligned at `cur` and ends within the range.
        let mut prefix_len: u8 = 32;
        while prefix_len > 0 {
            let larger = 1u64 << (32 - (prefix_len - 1));
            if cur % larger != 0 || cur + larger - 1 > end {
                break;
            }
            prefix_len -= 1;
        }

        let addr = Ipv4Addr::from(u32::try_from(cur).ok()?);
        out.push(Ipv4Net::new(addr, prefix_len).ok()?);
        cur += 1u64 << (32 - prefix_len);
    }

    Some(out)
}

/// Validate an IPv6 delegation whose value is a prefix length.
///
/// IPv4-mapped addresses (`::ffff:a.b.c.d`) are rejected.
pub fn ipv6_prefix(start: &str, prefix_len: i64) -> Option<Ipv6Net> {
    let addr: Ipv6Addr = start.parse().ok()?;
    if addr.to_ipv4_mapped().is_some() {
        return None;
    }
    let len = u8::try_from(prefix_len).ok().filter(|l| *l <= 128)?;
    Ipv6Net::new(addr, len).ok()
}

/// Turn one parsed range into its country-labeled prefixes.
///
/// Malformed records (unparseable address, non-positive count, prefix
/// length out of range) yield an empty vector.
pub fn expand(record: &RangeRecord) -> Vec<PrefixRecord> {
    match record.family {
        AddressFamily::V4 => {
            let Ok(start) = record.start.parse::<Ipv4Addr>() else {
                return Vec::new();
            };
            let Ok(count) = u64::try_from(record.value) else {
                return Vec::new();
            };
            ipv4_range_to_cidrs(start, count)
                .unwrap_or_default()
                .into_iter()
                .map(|net| PrefixRecord::new(IpNet::V4(net), record.country))
                .collect()
        }
        AddressFamily::V6 => ipv6_prefix(&record.start, record.value)
            .map(|net| PrefixRecord::new(IpNet::V6(net), record.country))
            .into_iter()
            .collect(),
    }
}

/// Total number of IPv4 addresses covered by a list of prefixes.
///
/// IPv6 prefixes are ignored.
pub fn count_ipv4_addresses(records: &[PrefixRecord]) -> u64 {
    records
        .iter()
        .filter_map(|r| match r.prefix {
            IpNet::V4(net) => Some(1u64 << (32 - net.prefix_len())),
            IpNet::V6(_) => None,
        })
        .sum()
}
