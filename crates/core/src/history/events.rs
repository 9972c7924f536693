use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indexers::QueryTelemetry;
use crate::search::SearchCriteria;

/// One dispatched indexer query, successful or not.
///
/// A successful fetch produces one event per HTTP sub-query, each with
/// telemetry. A failed fetch produces a single event with no telemetry,
/// the marker that the indexer was asked and contributed nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEvent {
    pub indexer_id: i32,
    pub indexer: String,
    pub criteria: SearchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<QueryTelemetry>,
}

impl QueryEvent {
    pub fn successful(&self) -> bool {
        self.telemetry.is_some()
    }

    /// Search type string for storage ("search", "movie", "tvsearch", ...)
    pub fn search_type(&self) -> &'static str {
        self.criteria.kind.search_type()
    }
}

/// A stored query record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub indexer_id: i32,
    pub indexer: String,
    pub search_type: String,
    pub successful: bool,
    pub data: QueryEvent,
}
