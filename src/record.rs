//! Record types flowing through the pipeline.

use ipnet::IpNet;
use std::fmt;

/// Country code used by the RIRs for "not specified".
pub const UNSPECIFIED_COUNTRY: &str = "ZZ";

/// Address family of a delegation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Map the `type` column of a stats line. Other types (`asn`) are `None`.
    pub fn from_stats_type(s: &str) -> Option<Self> {
        match s {
            "ipv4" => Some(Self::V4),
            "ipv6" => Some(Self::V6),
            _ => None,
        }
    }
}

/// Delegation status. Only delegated space is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Allocated,
    Assigned,
}

impl Status {
    pub fn from_stats_status(s: &str) -> Option<Self> {
        match s {
            "allocated" => Some(Self::Allocated),
            "assigned" => Some(Self::Assigned),
            _ => None,
        }
    }
}

/// ISO 3166 alpha-2 country code, always uppercase and never `ZZ`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Normalize and validate a raw country column.
    ///
    /// The input is uppercased first; the result must be exactly two ASCII
    /// letters and must not be the `ZZ` sentinel.
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let code = [bytes[0].to_ascii_uppercase(), bytes[1].to_ascii_uppercase()];
        if !code.iter().all(u8::is_ascii_uppercase) {
            return None;
        }
        if code == *UNSPECIFIED_COUNTRY.as_bytes() {
            return None;
        }
        Some(Self(code))
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

impl fmt::Debug for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountryCode({})", self)
    }
}

/// One accepted line of a delegated-extended file, before CIDR conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRecord {
    pub family: AddressFamily,
    /// Start address exactly as it appeared in the file.
    pub start: String,
    /// Address count for IPv4, prefix length for IPv6.
    pub value: i64,
    pub country: CountryCode,
    pub status: Status,
}

/// A single CIDR prefix labeled with its country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrefixRecord {
    pub prefix: IpNet,
    pub country: CountryCode,
}

impl PrefixRecord {
    pub fn new(prefix: IpNet, country: CountryCode) -> Self {
        Self { prefix, country }
    }
}

/// Formats as a CSV row body: `prefix,country`.
impl fmt::Display for PrefixRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.prefix, self.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_uppercases() {
        let cc = CountryCode::parse("au").unwrap();
        assert_eq!(cc.to_string(), "AU");
        assert_eq!(CountryCode::parse("Us").unwrap().to_string(), "US");
    }

    #[test]
    fn test_country_code_rejects_sentinel() {
        assert!(CountryCode::parse("ZZ").is_none());
        assert!(CountryCode::parse("zz").is_none());
    }

    #[test]
    fn test_country_code_rejects_bad_shapes() {
        assert!(CountryCode::parse("").is_none());
        assert!(CountryCode::parse("A").is_none());
        assert!(CountryCode::parse("USA").is_none());
        assert!(CountryCode::parse("A1").is_none());
        assert!(CountryCode::parse("*").is_none());
        assert!(CountryCode::parse("É").is_none());
    }

    #[test]
    fn test_family_and_status_mapping() {
        assert_eq!(AddressFamily::from_stats_type("ipv4"), Some(AddressFamily::V4));
        assert_eq!(AddressFamily::from_stats_type("ipv6"), Some(AddressFamily::V6));
        assert_eq!(AddressFamily::from_stats_type("asn"), None);
        assert_eq!(Status::from_stats_status("assigned"), Some(Status::Assigned));
        assert_eq!(Status::from_stats_status("available"), None);
        assert_eq!(Status::from_stats_status("reserved"), None);
    }

    #[test]
    fn test_prefix_record_display() {
        let rec = PrefixRecord::new(
            "1.0.0.0/24".parse().unwrap(),
            CountryCode::parse("AU").unwrap(),
        );
        assert_eq!(rec.to_string(), "1.0.0.0/24,AU");
    }
}
