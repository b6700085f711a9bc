//! Robustness tests for edge cases and error conditions.
//!
//! These tests verify that deflect-geoip rejects bad input and failing
//! networks cleanly instead of panicking or publishing a partial release.

use deflect_geoip::aggregator::{expand, ipv4_range_to_cidrs, ipv6_prefix};
use deflect_geoip::artifact::read_manifest;
use deflect_geoip::fetcher::{Fetcher, HttpTransport, RetryPolicy, Transport, TransportError};
use deflect_geoip::parser::{parse_bytes, parse_line, MAX_LINE_LEN};
use deflect_geoip::sources::Source;
use deflect_geoip::verify::verify_release;
use deflect_geoip::{Config, Error};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Test that an unreachable registry surfaces as a transport error
#[tokio::test]
async fn test_http_transport_timeout() {
    let transport = HttpTransport::new(Duration::from_millis(1)).unwrap();

    // Non-routable address, should time out rather than hang
    let result = transport.get("https://10.255.255.1:12345/delegated").await;
    match result {
        Err(TransportError::Connect(msg)) => assert!(!msg.is_empty()),
        other => panic!("expected connect error, got {:?}", other),
    }
}

/// Test that retries against a dead host end in FetchExhausted
#[tokio::test]
async fn test_fetcher_exhausts_against_dead_host() {
    let policy = RetryPolicy {
        max_attempts: 2,
        backoff_step: Duration::ZERO,
        timeout: Duration::from_millis(1),
    };
    let fetcher = Fetcher::new(policy).unwrap();
    let source = Source::new("dead", "https://10.255.255.1:12345/delegated");

    match fetcher.fetch_source(&source).await {
        Err(Error::FetchExhausted {
            source_name,
            attempts,
            ..
        }) => {
            assert_eq!(source_name, "dead");
            assert_eq!(attempts, 2);
        }
        other => panic!("expected FetchExhausted, got {:?}", other.map(|r| r.name)),
    }
}

/// Test parser edge cases that must be skipped silently
#[test]
fn test_parse_line_edge_cases() {
    // Too few fields
    assert!(parse_line("apnic|AU|ipv4|1.0.0.0|256|20110811").is_none());
    // Non-numeric value
    assert!(parse_line("apnic|AU|ipv4|1.0.0.0|lots|20110811|allocated").is_none());
    // Value outside i64
    assert!(parse_line("apnic|AU|ipv4|1.0.0.0|99999999999999999999|2011|allocated").is_none());
    // Reserved or unknown status
    assert!(parse_line("apnic|AU|ipv4|1.0.0.0|256|20110811|reserved").is_none());
    assert!(parse_line("apnic|AU|ipv4|1.0.0.0|256|20110811|ALLOCATED").is_none());
    // Country placeholders
    assert!(parse_line("apnic|ZZ|ipv4|1.0.0.0|256|20110811|allocated").is_none());
    assert!(parse_line("apnic|*|ipv4|*|40000|summary|x").is_none());
    assert!(parse_line("apnic|AUS|ipv4|1.0.0.0|256|20110811|allocated").is_none());
    // ASN records
    assert!(parse_line("apnic|AU|asn|173|1|20020801|allocated").is_none());
    // Whitespace only
    assert!(parse_line("   ").is_none());
    assert!(parse_line("\r\n").is_none());
}

/// Test Unicode lookalikes never become records
#[test]
fn test_unicode_lookalikes() {
    // Full-width country letters
    assert!(parse_line("apnic|ＡＵ|ipv4|1.0.0.0|256|20110811|allocated").is_none());

    // Full-width digits survive parsing but never expand
    let record = parse_line("apnic|AU|ipv4|１.0.0.0|256|20110811|allocated").unwrap();
    assert!(expand(&record).is_empty());

    let record = parse_line("apnic|AU|ipv6|2001:db8::\u{200B}|32|20110811|allocated").unwrap();
    assert!(expand(&record).is_empty());
}

/// Test large input handling
#[test]
fn test_large_input_handling() {
    let mut body = String::with_capacity(100_000 * 64);
    for i in 0..100_000u32 {
        body.push_str(&format!(
            "apnic|AU|ipv4|{}.{}.{}.0|256|20110811|allocated|x\n",
            (i >> 16) & 0xff,
            (i >> 8) & 0xff,
            i & 0xff
        ));
    }

    let records = parse_bytes(body.as_bytes()).unwrap();
    assert_eq!(records.len(), 100_000);
    assert!(records.iter().all(|r| expand(r).len() == 1));
}

/// Test that an overlong line is a read error, not an allocation blow-up
#[test]
fn test_overlong_line_rejected() {
    let mut body = b"apnic|AU|ipv4|1.0.0.0|256|20110811|allocated\n".to_vec();
    body.extend(std::iter::repeat(b'x').take(MAX_LINE_LEN + 10));
    body.push(b'\n');

    let err = parse_bytes(&body).unwrap_err();
    assert_eq!(err.offset, 45);
}

/// Test that a truncated final line without newline still parses
#[test]
fn test_missing_trailing_newline() {
    let records = parse_bytes(b"apnic|AU|ipv4|1.0.0.0|256|20110811|allocated").unwrap();
    assert_eq!(records.len(), 1);
}

/// Test range boundaries of the IPv4 space
#[test]
fn test_ipv4_address_space_edges() {
    let top = ipv4_range_to_cidrs("255.255.255.0".parse().unwrap(), 256).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].to_string(), "255.255.255.0/24");

    assert!(ipv4_range_to_cidrs("255.255.255.0".parse().unwrap(), 257).is_none());
    assert!(ipv4_range_to_cidrs("0.0.0.0".parse().unwrap(), 0).is_none());
    assert!(ipv4_range_to_cidrs("0.0.0.1".parse().unwrap(), u64::MAX).is_none());

    let whole = ipv4_range_to_cidrs("0.0.0.0".parse().unwrap(), 1 << 32).unwrap();
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].to_string(), "0.0.0.0/0");
}

/// Test IPv6 prefix validation edge cases
#[test]
fn test_ipv6_prefix_edge_cases() {
    assert!(ipv6_prefix("::", 0).is_some());
    assert!(ipv6_prefix("2001:db8::1", 128).is_some());
    assert!(ipv6_prefix("2001:db8::", 129).is_none());
    assert!(ipv6_prefix("2001:db8::", -1).is_none());
    assert!(ipv6_prefix("::ffff:1.2.3.4", 128).is_none());
    assert!(ipv6_prefix("1.2.3.4", 32).is_none());
    assert!(ipv6_prefix("", 32).is_none());
}

/// Test that YAML parsing handles malformed input
#[test]
fn test_yaml_malformed_input() {
    assert!(Config::from_yaml("{{{{not valid yaml").is_err());
    assert!(Config::from_yaml("fetch: [1, 2, 3]").is_err());
    assert!(Config::from_yaml("fetch:\n  max_attempts: -1\n").is_err());
    assert!(Config::from_yaml("fetch:\n  max_attempts: 0\n").is_err());
    assert!(Config::from_yaml("sources: []\n").is_err());
    assert!(Config::from_yaml("sources:\n  - name: arin\n").is_err());
    assert!(Config::from_yaml(
        "sources:\n  - name: Bad Name\n    url: https://example.org/stats\n"
    )
    .is_err());
    assert!(Config::from_yaml(
        "sources:\n  - name: a\n    url: https://example.org/a\n  - name: a\n    url: https://example.org/b\n"
    )
    .is_err());
}

/// Test that a corrupt manifest is reported, not trusted
#[test]
fn test_manifest_malformed_input() {
    let temp = TempDir::new().unwrap();
    let releases = temp.path().join("releases");
    fs::create_dir_all(&releases).unwrap();

    fs::write(releases.join("latest.json"), "{not valid json}").unwrap();
    assert!(matches!(read_manifest(temp.path()), Err(Error::Manifest(_))));

    fs::write(releases.join("latest.json"), "{\"name\": \"deflect-geoip-country\"").unwrap();
    assert!(matches!(read_manifest(temp.path()), Err(Error::Manifest(_))));
}

/// Test that verify refuses artifact paths outside the output directory
#[test]
fn test_verify_rejects_escaping_path() {
    let temp = TempDir::new().unwrap();
    let releases = temp.path().join("releases");
    fs::create_dir_all(&releases).unwrap();
    fs::write(
        releases.join("latest.json"),
        r#"{
  "name": "deflect-geoip-country",
  "version": "x",
  "generated_at": "2024-05-01T00:00:00Z",
  "sources": ["arin-delegated"],
  "artifacts": [
    {"type": "countrydb.csv.gz", "path": "../../etc/passwd", "sha256": "00", "bytes": 1}
  ]
}
"#,
    )
    .unwrap();

    let err = verify_release(temp.path()).unwrap_err();
    assert!(err.to_string().contains("unsafe artifact path"));
}

/// Test that a manifest without artifacts does not verify
#[test]
fn test_verify_rejects_empty_manifest() {
    let temp = TempDir::new().unwrap();
    let releases = temp.path().join("releases");
    fs::create_dir_all(&releases).unwrap();
    fs::write(
        releases.join("latest.json"),
        r#"{"name":"deflect-geoip-country","version":"x","generated_at":"2024-05-01T00:00:00Z","sources":[],"artifacts":[]}"#,
    )
    .unwrap();

    assert!(verify_release(temp.path()).is_err());
}
