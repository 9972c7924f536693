//! Indexer abstraction.
//!
//! An indexer is an external content-indexing API (usenet or torrent)
//! queried through the `Indexer` trait. Each supported family (rarbg,
//! newznab) owns its transport and its `ResponseParser`; the dispatch
//! engine in [`crate::search`] only sees canonical [`Release`] records.

mod categories;
mod newznab;
mod rarbg;
mod registry;
mod release;
mod response;

pub use categories::{canonical, CategoryMapping, IndexerCategory};
pub use newznab::{NewznabIndexer, NewznabParser};
pub use rarbg::{RarbgIndexer, RarbgParser};
pub use registry::{IndexerRegistry, StaticRegistry};
pub use release::Release;
pub use response::{FetchResult, IndexerResponse, QueryTelemetry, ResponseParser};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::SearchCriteria;

/// How a release obtained from this indexer is downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadProtocol {
    Usenet,
    Torrent,
}

impl DownloadProtocol {
    pub fn is_usenet(self) -> bool {
        matches!(self, DownloadProtocol::Usenet)
    }

    pub fn is_torrent(self) -> bool {
        matches!(self, DownloadProtocol::Torrent)
    }
}

/// Identity and declared capabilities of one configured indexer.
/// Owned by the registry; the search core only reads it.
#[derive(Debug, Clone)]
pub struct IndexerDefinition {
    /// Stable numeric id. Positive; -1 and -2 are reserved selection
    /// sentinels ("all usenet" / "all torrent").
    pub id: i32,
    pub name: String,
    pub protocol: DownloadProtocol,
    pub capabilities: IndexerCapabilities,
}

#[derive(Debug, Clone, Default)]
pub struct IndexerCapabilities {
    pub categories: CategoryMapping,
}

/// Errors that can occur while querying or parsing an indexer.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected status code {0}")]
    UnexpectedStatus(u16),

    #[error("Indexer API error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Search was cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for IndexerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IndexerError::Timeout
        } else if e.is_connect() {
            IndexerError::Connection(e.to_string())
        } else {
            IndexerError::Parse(e.to_string())
        }
    }
}

/// A queryable indexer: definition plus the family-specific fetch
/// pipeline (request building, transport, parsing).
#[async_trait]
pub trait Indexer: Send + Sync {
    fn definition(&self) -> &IndexerDefinition;

    fn name(&self) -> &str {
        &self.definition().name
    }

    fn protocol(&self) -> DownloadProtocol {
        self.definition().protocol
    }

    /// Execute one logical search. May issue multiple physical requests
    /// internally; each is reported as a sub-query in the result.
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<FetchResult, IndexerError>;
}
