//! # deflect-geoip - Country IP prefix database builder
//!
//! Builds a compact, deduplicated, country-labeled IP prefix database from
//! the public "delegated extended" statistics of the five Regional Internet
//! Registries (AFRINIC, APNIC, ARIN, LACNIC, RIPE NCC) and publishes it as a
//! versioned, SHA-256 verified release.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      deflect-geoip                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: build, sources, verify, version            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Sources, retry policy, output directory              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls, Transport trait)                │
//! │    └── Full-body download, linear backoff, 5 attempts       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Parser                                                     │
//! │    └── registry|cc|type|start|value|date|status lines       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Aggregator (ipnet)                                         │
//! │    └── IPv4 range -> minimal CIDR set, IPv6 pass-through    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Merge                                                      │
//! │    └── Dedup across sources, fail on country conflicts      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Artifact (flate2 + sha2)                                   │
//! │    └── countrydb.csv.gz, .sha256 sidecar, latest.json       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use deflect_geoip::artifact::ArtifactWriter;
//! use deflect_geoip::config::Config;
//! use deflect_geoip::fetcher::Fetcher;
//! use deflect_geoip::pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let fetcher = Fetcher::new(config.fetch.retry_policy())?;
//!     let writer = ArtifactWriter::new(&config.output_dir);
//!
//!     let (_, manifest) = pipeline::build(&fetcher, &config.sources, &writer, "2024-05-01").await?;
//!     println!("sha256 {}", manifest.artifacts[0].sha256);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`aggregator`] - Range to CIDR conversion
//! - [`artifact`] - Release writer and manifest
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Error types
//! - [`fetcher`] - HTTP download with retries
//! - [`merge`] - Cross-source merge and conflict detection
//! - [`parser`] - Delegated-extended format parser
//! - [`pipeline`] - End-to-end build
//! - [`record`] - Record types
//! - [`sources`] - Built-in RIR source table
//! - [`utils`] - Formatting helpers
//! - [`validation`] - Input validation
//! - [`verify`] - Release verification

pub mod aggregator;
pub mod artifact;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod sources;
pub mod utils;
pub mod validation;
pub mod verify;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{Error, Result};
