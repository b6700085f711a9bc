//! Build command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifact::ArtifactWriter;
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::pipeline;
use crate::utils::{format_bytes, format_count};
use crate::validation::{default_version_label, validate_version_label};

/// Run the build command
pub async fn run(
    out: Option<PathBuf>,
    version_label: Option<String>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;

    let out_dir = out.unwrap_or_else(|| config.output_dir.clone());
    let version = version_label.unwrap_or_else(|| default_version_label(Utc::now()));
    validate_version_label(&version)?;

    info!(
        "Building release {} from {} sources into {}",
        version,
        config.sources.len(),
        out_dir.display()
    );

    let fetcher = Fetcher::new(config.fetch.retry_policy())?;
    let writer = ArtifactWriter::new(&out_dir);

    let (output, manifest) = pipeline::build(&fetcher, &config.sources, &writer, &version)
        .await
        .with_context(|| format!("Release {} aborted, no manifest written", version))?;

    println!();
    for summary in &output.summaries {
        println!(
            " {:<10} {:>10} {:>10} ranges {:>10} prefixes",
            summary.name,
            format_bytes(summary.bytes as u64),
            format_count(summary.ranges),
            format_count(summary.prefixes),
        );
    }
    for artifact in &manifest.artifacts {
        println!(
            "[OK] {} ({}, {} prefixes)",
            out_dir.join(&artifact.path).display(),
            format_bytes(artifact.bytes),
            format_count(output.records.len())
        );
        println!("     sha256 {}", artifact.sha256);
    }

    Ok(())
}
