use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cache::DEFAULT_TTL_SECS;

/// Settings for the storefront client.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ClientConfig {
    /// Server root, e.g. `http://localhost:5000`. `/api/...` paths are appended.
    pub base_url: String,
    /// Where the bearer credential is persisted. In-memory when absent.
    #[serde(default)]
    pub credential_path: Option<PathBuf>,
    /// Freshness window of cached query results, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            credential_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}
