use chrono::{DateTime, Utc};
use thiserror::Error;

use super::QueryRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Filter for querying the search history
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub indexer_id: Option<i32>,
    pub search_type: Option<String>,
    pub successful: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_indexer_id(mut self, indexer_id: i32) -> Self {
        self.indexer_id = Some(indexer_id);
        self
    }

    pub fn with_search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    pub fn with_successful(mut self, successful: bool) -> Self {
        self.successful = Some(successful);
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for query history storage
pub trait HistoryStore: Send + Sync {
    /// Insert a query record, returns the assigned ID
    fn insert(&self, record: &QueryRecord) -> Result<i64, HistoryError>;

    /// Query records with optional filters
    fn query(&self, filter: &HistoryFilter) -> Result<Vec<QueryRecord>, HistoryError>;

    /// Count matching records
    fn count(&self, filter: &HistoryFilter) -> Result<i64, HistoryError>;
}
