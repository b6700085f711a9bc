//! Parser for the RIR "delegated extended" statistics format.
//!
//! Each data line looks like
//! `registry|cc|type|start|value|date|status[|opaque-id|...]`.
//! Header, summary, comment and malformed lines are skipped, including lines
//! whose used fields are not UTF-8. Only a failure of the underlying reader
//! or a line over [`MAX_LINE_LEN`] aborts parsing.

use std::io::{self, BufRead, Read};
use thiserror::Error;

use crate::record::{AddressFamily, CountryCode, RangeRecord, Status};

/// Longest accepted line, newline excluded.
pub const MAX_LINE_LEN: usize = 4 * 1024 * 1024;

/// Minimum number of pipe-separated fields in a data line.
const MIN_FIELDS: usize = 7;

/// The reader failed partway through a file.
#[derive(Error, Debug)]
#[error("read failed at byte offset {offset}: {source}")]
pub struct ParseError {
    /// Offset of the first byte of the line being read.
    pub offset: u64,
    #[source]
    pub source: io::Error,
}

/// Parse a whole delegated-extended file.
pub fn parse_delegated_extended<R: BufRead>(mut reader: R) -> Result<Vec<RangeRecord>, ParseError> {
    let mut out = Vec::new();
    let mut buf = Vec::new();
    let mut offset: u64 = 0;
    let limit = MAX_LINE_LEN as u64 + 1;

    loop {
        buf.clear();
        let n = (&mut reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .map_err(|source| ParseError { offset, source })?;
        if n == 0 {
            break;
        }

        if n as u64 == limit && !buf.ends_with(b"\n") {
            return Err(ParseError {
                offset,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line longer than {} bytes", MAX_LINE_LEN),
                ),
            });
        }

        if let Some(record) = parse_record(&buf) {
            out.push(record);
        }
        offset += n as u64;
    }

    Ok(out)
}

/// Parse an in-memory body.
pub fn parse_bytes(body: &[u8]) -> Result<Vec<RangeRecord>, ParseError> {
    parse_delegated_extended(body)
}

/// Decode one line, returning `None` for anything that is not an accepted
/// IPv4/IPv6 delegation.
pub fn parse_line(line: &str) -> Option<RangeRecord> {
    parse_record(line.as_bytes())
}

/// Byte-level form of [`parse_line`].
///
/// Only the country, type, start, value, date and status fields are
/// decoded; bytes in the registry or trailing opaque fields are never
/// looked at.
pub fn parse_record(line: &[u8]) -> Option<RangeRecord> {
    let mut line = line;
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    if line.is_empty() || line.starts_with(b"#") {
        return None;
    }

    let raw: Vec<&[u8]> = line.split(|b| *b == b'|').collect();
    if raw.len() < MIN_FIELDS {
        return None;
    }
    let mut fields = [""; MIN_FIELDS];
    for (i, field) in raw.iter().enumerate().take(MIN_FIELDS).skip(1) {
        fields[i] = std::str::from_utf8(field).ok()?;
    }

    let status = Status::from_stats_status(fields[6])?;
    let country = CountryCode::parse(fields[1])?;
    let family = AddressFamily::from_stats_type(fields[2])?;
    let value = fields[4].parse::<i64>().ok()?;

    Some(RangeRecord {
        family,
        start: fields[3].to_string(),
        value,
        country,
        status,
    })
}
