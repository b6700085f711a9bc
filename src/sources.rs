//! Built-in table of RIR delegated-extended statistics endpoints.

use serde::{Deserialize, Serialize};

/// Suffix appended to a source name in the release manifest.
pub const MANIFEST_SUFFIX: &str = "-delegated";

/// One upstream statistics file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Identifier recorded in `latest.json`, e.g. `arin-delegated`.
    pub fn manifest_id(&self) -> String {
        format!("{}{}", self.name, MANIFEST_SUFFIX)
    }
}

/// The five registries, in the order they are fetched.
pub const REGISTRY: &[(&str, &str)] = &[
    (
        "arin",
        "https://ftp.arin.net/pub/stats/arin/delegated-arin-extended-latest",
    ),
    (
        "ripe",
        "https://ftp.ripe.net/pub/stats/ripencc/delegated-ripencc-extended-latest",
    ),
    (
        "apnic",
        "https://ftp.apnic.net/stats/apnic/delegated-apnic-extended-latest",
    ),
    (
        "lacnic",
        "https://ftp.lacnic.net/pub/stats/lacnic/delegated-lacnic-extended-latest",
    ),
    (
        "afrinic",
        "https://ftp.afrinic.net/pub/stats/afrinic/delegated-afrinic-extended-latest",
    ),
];

/// Owned copy of the built-in registry.
pub fn default_sources() -> Vec<Source> {
    REGISTRY
        .iter()
        .map(|(name, url)| Source::new(*name, *url))
        .collect()
}

/// Manifest identifiers for `sources`, sorted so the manifest does not
/// depend on fetch order.
pub fn manifest_ids(sources: &[Source]) -> Vec<String> {
    let mut ids: Vec<String> = sources.iter().map(Source::manifest_id).collect();
    ids.sort();
    ids
}
