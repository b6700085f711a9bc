//! Configuration for deflect-geoip.
//!
//! Everything has a built-in default, so the YAML file is optional. A file
//! only needs the keys it overrides:
//!
//! ```yaml
//! output_dir: /srv/geoip
//! fetch:
//!   max_attempts: 3
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::RetryPolicy;
use crate::sources::{default_sources, Source};
use crate::validation::{validate_source_name, validate_source_url};

/// Per-attempt request timeout (5 minutes)
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Backoff after attempt N is N times this step
const DEFAULT_BACKOFF_STEP_SECS: u64 = 10;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory receiving `releases/`
    pub output_dir: PathBuf,

    /// Download behaviour
    pub fetch: FetchConfig,

    /// Statistics files to merge, fetched in this order
    pub sources: Vec<Source>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("dist"),
            fetch: FetchConfig::default(),
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_step_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step_secs: DEFAULT_BACKOFF_STEP_SECS,
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_step: Duration::from_secs(self.backoff_step_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load the file if one was given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("At least one source must be configured");
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            validate_source_name(&source.name)?;
            validate_source_url(&source.name, &source.url)?;
            if !seen.insert(source.name.as_str()) {
                anyhow::bail!("Duplicate source name '{}'", source.name);
            }
        }

        if self.fetch.max_attempts == 0 {
            anyhow::bail!("fetch.max_attempts must be at least 1");
        }
        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be at least 1");
        }

        if self.output_dir.as_os_str().is_empty() {
            anyhow::bail!("output_dir must not be empty");
        }

        Ok(())
    }
}
