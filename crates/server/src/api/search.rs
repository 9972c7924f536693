//! Search API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use dragnet_core::{Release, SearchError, SearchRequest};

use crate::metrics::{
    SEARCH_DURATION, SEARCH_REJECTED_TOTAL, SEARCH_RELEASES_RETURNED, SEARCH_REQUESTS_TOTAL,
};
use crate::state::AppState;

/// Query parameters for the search endpoint, newznab style.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub t: Option<String>,
    pub q: Option<String>,
    pub cat: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub source: Option<String>,
    pub host: Option<String>,

    pub imdbid: Option<String>,
    pub tmdbid: Option<u32>,
    pub traktid: Option<u32>,
    pub year: Option<u32>,

    pub tvdbid: Option<u32>,
    pub rid: Option<u32>,
    pub tvmazeid: Option<u32>,
    pub season: Option<u32>,
    pub ep: Option<u32>,

    pub artist: Option<String>,
    pub album: Option<String>,
    pub label: Option<String>,

    pub author: Option<String>,
    pub title: Option<String>,

    /// Comma-separated indexer ids. -1 means all usenet, -2 all torrent.
    pub indexerids: Option<String>,
    /// Whether a user triggered this search.
    #[serde(default)]
    pub interactive: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub releases: Vec<Release>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: String) -> ErrorReply {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

/// GET /api/v1/search
///
/// Execute a search across the selected indexers and return the merged
/// releases.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, impl IntoResponse> {
    let indexer_ids = match parse_indexer_ids(params.indexerids.as_deref()) {
        Ok(ids) => ids,
        Err(raw) => {
            SEARCH_REJECTED_TOTAL
                .with_label_values(&["invalid_indexer_id"])
                .inc();
            return Err(bad_request(format!("Invalid indexer id: {raw}")));
        }
    };

    let request = SearchRequest {
        t: params.t,
        q: params.q,
        cat: params.cat,
        limit: params.limit,
        offset: params.offset,
        source: params.source,
        host: params.host,
        imdbid: params.imdbid,
        tmdbid: params.tmdbid,
        traktid: params.traktid,
        year: params.year,
        tvdbid: params.tvdbid,
        rid: params.rid,
        tvmazeid: params.tvmazeid,
        season: params.season,
        ep: params.ep,
        artist: params.artist,
        album: params.album,
        label: params.label,
        author: params.author,
        title: params.title,
    };

    let search_type = request.t.as_deref().unwrap_or("search").to_string();
    SEARCH_REQUESTS_TOTAL
        .with_label_values(&[&search_type])
        .inc();

    let started = Instant::now();
    match state
        .search()
        .search(&request, indexer_ids, params.interactive)
        .await
    {
        Ok(results) => {
            SEARCH_DURATION
                .with_label_values(&[&search_type])
                .observe(started.elapsed().as_secs_f64());
            SEARCH_RELEASES_RETURNED.observe(results.releases.len() as f64);

            Ok(Json(SearchResponse {
                total: results.releases.len(),
                releases: results.releases,
            }))
        }
        Err(e @ SearchError::InvalidCategory(_)) => {
            SEARCH_REJECTED_TOTAL
                .with_label_values(&["invalid_category"])
                .inc();
            Err(bad_request(e.to_string()))
        }
    }
}

fn parse_indexer_ids(raw: Option<&str>) -> Result<Vec<i32>, String> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part.parse::<i32>().map_err(|_| part.to_string())?;
        ids.push(id);
    }
    Ok(ids)
}
