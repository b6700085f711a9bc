//! Cross-source merge of prefix records with conflict detection.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::record::{CountryCode, PrefixRecord};

/// Outcome of inserting one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// First time this prefix was seen.
    New,
    /// Same prefix and same country already present; dropped.
    Duplicate,
}

/// Prefix -> country map built incrementally as sources are processed.
///
/// A prefix is stored once. Seeing it again with a different country is a
/// [`Error::Conflict`].
#[derive(Debug, Default)]
pub struct MergedSet {
    index: HashMap<String, Entry>,
    records: Vec<PrefixRecord>,
    /// Names of the sources seen so far; entries refer to them by position.
    sources: Vec<String>,
    duplicates: usize,
}

#[derive(Debug)]
struct Entry {
    country: CountryCode,
    source: usize,
}

impl MergedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record supplied by `source`.
    pub fn insert(&mut self, record: PrefixRecord, source: &str) -> Result<Insert> {
        let key = record.prefix.to_string();
        if let Some(existing) = self.index.get(&key) {
            if existing.country != record.country {
                return Err(Error::Conflict {
                    prefix: key,
                    first: existing.country,
                    first_source: self.sources[existing.source].clone(),
                    second: record.country,
                    second_source: source.to_string(),
                });
            }
            self.duplicates += 1;
            return Ok(Insert::Duplicate);
        }

        let source = self.source_index(source);
        self.index.insert(
            key,
            Entry {
                country: record.country,
                source,
            },
        );
        self.records.push(record);
        Ok(Insert::New)
    }

    fn source_index(&mut self, source: &str) -> usize {
        match self.sources.iter().rposition(|s| s == source) {
            Some(i) => i,
            None => {
                self.sources.push(source.to_string());
                self.sources.len() - 1
            }
        }
    }

    /// Add every record of one source, stopping at the first conflict.
    ///
    /// Returns the number of records that were new.
    pub fn extend_from_source<I>(&mut self, records: I, source: &str) -> Result<usize>
    where
        I: IntoIterator<Item = PrefixRecord>,
    {
        let mut added = 0;
        for record in records {
            if self.insert(record, source)? == Insert::New {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Country currently recorded for `prefix`.
    pub fn get(&self, prefix: &str) -> Option<CountryCode> {
        self.index.get(prefix).map(|e| e.country)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped as harmless duplicates.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Distinct records sorted lexicographically by prefix string.
    pub fn into_sorted(self) -> Vec<PrefixRecord> {
        let mut records = self.records;
        records.sort_by_cached_key(|r| r.prefix.to_string());
        records
    }
}

/// Merge `(source, record)` pairs in order and return the sorted result.
pub fn merge<'a, I>(records: I) -> Result<Vec<PrefixRecord>>
where
    I: IntoIterator<Item = (&'a str, PrefixRecord)>,
{
    let mut set = MergedSet::new();
    for (source, record) in records {
        set.insert(record, source)?;
    }
    Ok(set.into_sorted())
}
