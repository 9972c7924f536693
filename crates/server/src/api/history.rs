use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use dragnet_core::{HistoryFilter, QueryRecord};

use crate::state::AppState;

/// Maximum allowed limit for history queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for history queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQueryParams {
    /// Filter by indexer id
    pub indexer_id: Option<i32>,
    /// Filter by search type ("search", "movie", ...)
    pub search_type: Option<String>,
    /// Filter by outcome
    pub successful: Option<bool>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for the history endpoint
#[derive(Debug, Serialize)]
pub struct HistoryQueryResponse {
    /// Matching query records
    pub events: Vec<QueryRecord>,
    /// Total number of matching records
    pub total: i64,
    /// Limit used for this query
    pub limit: i64,
    /// Offset used for this query
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct HistoryErrorResponse {
    pub error: String,
}

/// Query the search history
pub async fn query_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQueryParams>,
) -> Result<Json<HistoryQueryResponse>, impl IntoResponse> {
    // Validate and cap limit
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    // Build base filter (shared between query and count)
    let mut base_filter = HistoryFilter::new();

    if let Some(indexer_id) = params.indexer_id {
        base_filter = base_filter.with_indexer_id(indexer_id);
    }

    if let Some(ref search_type) = params.search_type {
        base_filter = base_filter.with_search_type(search_type);
    }

    if let Some(successful) = params.successful {
        base_filter = base_filter.with_successful(successful);
    }

    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let query_filter = HistoryFilter {
        limit,
        offset,
        ..base_filter.clone()
    };

    let events = match state.history().query(&query_filter) {
        Ok(events) => events,
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HistoryErrorResponse {
                    error: format!("Failed to query history: {}", e),
                }),
            ));
        }
    };

    // Total count without pagination, using the base filter
    let total = match state.history().count(&base_filter) {
        Ok(count) => count,
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HistoryErrorResponse {
                    error: format!("Failed to count history: {}", e),
                }),
            ));
        }
    };

    Ok(Json(HistoryQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
