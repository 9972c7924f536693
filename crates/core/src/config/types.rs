use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub indexers: Vec<IndexerConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration (query history storage)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("dragnet.db")
}

/// Search dispatch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Per-request HTTP timeout for indexer fetches, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Buffer size for the query-event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_event_buffer() -> usize {
    1000
}

/// One configured indexer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    /// Stable positive id; -1 and -2 are reserved selection sentinels.
    pub id: i32,
    pub name: String,
    pub family: IndexerFamily,
    /// Base URL of the indexer API.
    pub url: String,
    /// API key, required for newznab indexers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Query quota, max queries per minute. Absent means unlimited.
    #[serde(default)]
    pub queries_per_minute: Option<u32>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Supported indexer families
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexerFamily {
    Rarbg,
    Newznab,
}

/// Sanitized config for API responses (API keys redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub indexers: Vec<SanitizedIndexerConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIndexerConfig {
    pub id: i32,
    pub name: String,
    pub family: IndexerFamily,
    pub url: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries_per_minute: Option<u32>,
    pub enabled: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            search: config.search.clone(),
            indexers: config
                .indexers
                .iter()
                .map(|i| SanitizedIndexerConfig {
                    id: i.id,
                    name: i.name.clone(),
                    family: i.family,
                    url: i.url.clone(),
                    api_key_configured: i.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                    queries_per_minute: i.queries_per_minute,
                    enabled: i.enabled,
                })
                .collect(),
        }
    }
}
