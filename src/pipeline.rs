//! End-to-end build: fetch every source, expand, merge, write.
//!
//! Sources are processed one at a time so only one body is held in memory
//! and the merge set has a single writer. Any error aborts the whole build
//! before the manifest is written.

use chrono::Utc;
use tracing::info;

use crate::aggregator::{count_ipv4_addresses, expand};
use crate::artifact::{ArtifactWriter, Manifest};
use crate::error::Result;
use crate::fetcher::{Fetcher, Transport};
use crate::merge::MergedSet;
use crate::record::PrefixRecord;
use crate::sources::{manifest_ids, Source};
use crate::utils::{format_bytes, format_count};

/// Per-source figures, for logging and the console summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub name: String,
    pub bytes: usize,
    pub ranges: usize,
    pub prefixes: usize,
    /// Prefixes not already supplied by an earlier source.
    pub new_prefixes: usize,
}

/// Merged database ready to be written.
#[derive(Debug)]
pub struct BuildOutput {
    /// Sorted by prefix string.
    pub records: Vec<PrefixRecord>,
    /// Manifest source identifiers, sorted.
    pub sources: Vec<String>,
    pub summaries: Vec<SourceSummary>,
    pub duplicates: usize,
}

/// Fetch all sources in order and merge them.
pub async fn collect<T: Transport>(fetcher: &Fetcher<T>, sources: &[Source]) -> Result<BuildOutput> {
    let mut set = MergedSet::new();
    let mut summaries = Vec::with_capacity(sources.len());

    for source in sources {
        let fetched = fetcher.fetch_source(source).await?;
        let prefixes: Vec<PrefixRecord> = fetched.ranges.iter().flat_map(expand).collect();
        let prefix_count = prefixes.len();
        let new_prefixes = set.extend_from_source(prefixes, &source.name)?;

        info!(
            "{}: {} ranges -> {} prefixes ({} new)",
            source.name,
            format_count(fetched.ranges.len()),
            format_count(prefix_count),
            format_count(new_prefixes)
        );

        summaries.push(SourceSummary {
            name: source.name.clone(),
            bytes: fetched.bytes,
            ranges: fetched.ranges.len(),
            prefixes: prefix_count,
            new_prefixes,
        });
    }

    let duplicates = set.duplicates();
    let records = set.into_sorted();
    info!(
        "Merged {} prefixes ({} duplicates dropped, {} IPv4 addresses)",
        format_count(records.len()),
        format_count(duplicates),
        count_ipv4_addresses(&records)
    );

    Ok(BuildOutput {
        records,
        sources: manifest_ids(sources),
        summaries,
        duplicates,
    })
}

/// Run the full pipeline and publish a release.
///
/// `generated_at` in the manifest is taken once all sources are merged.
pub async fn build<T: Transport>(
    fetcher: &Fetcher<T>,
    sources: &[Source],
    writer: &ArtifactWriter,
    version: &str,
) -> Result<(BuildOutput, Manifest)> {
    let output = collect(fetcher, sources).await?;
    let manifest = writer.write_release(
        version,
        &output.records,
        output.sources.clone(),
        Utc::now(),
    )?;

    let total_bytes: usize = output.summaries.iter().map(|s| s.bytes).sum();
    info!(
        "Release {} complete ({} downloaded from {} sources)",
        version,
        format_bytes(total_bytes as u64),
        output.summaries.len()
    );

    Ok((output, manifest))
}
