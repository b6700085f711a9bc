//! Verify command implementation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::utils::format_bytes;
use crate::verify::verify_release;

/// Run the verify command
pub fn run(out: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let out_dir = out.unwrap_or(config.output_dir);

    info!("Verifying latest release in {}", out_dir.display());
    let manifest = verify_release(&out_dir)
        .with_context(|| format!("Verification of {} failed", out_dir.display()))?;

    for artifact in &manifest.artifacts {
        println!(
            "[OK] {} {} ({})",
            artifact.sha256,
            artifact.path,
            format_bytes(artifact.bytes)
        );
    }
    println!(
        "     {} version {} generated {}",
        manifest.name,
        manifest.version,
        manifest.generated_at.to_rfc3339()
    );

    Ok(())
}
