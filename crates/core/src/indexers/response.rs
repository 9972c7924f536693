//! Raw indexer responses and the per-family parser seam.

use serde::{Deserialize, Serialize};

use super::{IndexerError, Release};

/// A captured HTTP response from an indexer, handed to the family's
/// parser unmodified.
#[derive(Debug, Clone)]
pub struct IndexerResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Converts one raw indexer response into canonical releases.
///
/// Each indexer family implements this once; the dispatch engine never
/// inspects family-specific shapes. Implementations validate the
/// transport status first, then classify application-level error codes
/// into "no results" (empty list) or a hard [`IndexerError::Api`].
pub trait ResponseParser: Send + Sync {
    fn parse(&self, response: &IndexerResponse) -> Result<Vec<Release>, IndexerError>;
}

/// Telemetry for one physical request issued during a logical search.
/// An indexer that paginates internally produces one record per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTelemetry {
    pub url: String,
    pub status: u16,
    pub elapsed_ms: u64,
    pub item_count: u32,
}

/// What one indexer contributed to a logical search: the parsed releases
/// plus telemetry for every sub-query it issued along the way.
#[derive(Debug, Default)]
pub struct FetchResult {
    pub releases: Vec<Release>,
    pub queries: Vec<QueryTelemetry>,
}
