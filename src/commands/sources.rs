//! Sources command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::utils::truncate;

/// Run the sources command
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;

    println!();
    println!(" {:<18} URL", "SOURCE");
    println!(" {:<18} {}", "─".repeat(18), "─".repeat(60));
    for source in &config.sources {
        println!(" {:<18} {}", truncate(&source.manifest_id(), 18), source.url);
    }
    println!();
    println!(
        " Retries: {} attempts, {}s linear backoff step, {}s timeout",
        config.fetch.max_attempts, config.fetch.backoff_step_secs, config.fetch.timeout_secs
    );
    println!();

    Ok(())
}
