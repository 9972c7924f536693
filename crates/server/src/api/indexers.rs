//! Indexer listing handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use dragnet_core::indexers::IndexerCategory;
use dragnet_core::DownloadProtocol;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IndexersResponse {
    pub indexers: Vec<IndexerInfo>,
}

#[derive(Debug, Serialize)]
pub struct IndexerInfo {
    pub id: i32,
    pub name: String,
    pub protocol: DownloadProtocol,
    pub categories: Vec<IndexerCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaInfo>,
}

/// Current quota state of a rate-limited indexer.
#[derive(Debug, Serialize)]
pub struct QuotaInfo {
    pub queries_per_minute: u32,
    pub tokens_available: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_available_in_ms: Option<u64>,
}

/// GET /api/v1/indexers
///
/// List the registered indexers with their declared categories and
/// current quota state.
pub async fn list_indexers(State(state): State<Arc<AppState>>) -> Json<IndexersResponse> {
    let mut indexers = Vec::new();
    for indexer in state.registry().available() {
        let definition = indexer.definition();
        let quota = state.limiter().status(definition.id).await.map(|status| QuotaInfo {
            queries_per_minute: status.queries_per_minute,
            tokens_available: status.tokens_available,
            next_available_in_ms: status.next_available_in_ms,
        });

        indexers.push(IndexerInfo {
            id: definition.id,
            name: definition.name.clone(),
            protocol: definition.protocol,
            categories: definition.capabilities.categories.categories().to_vec(),
            quota,
        });
    }

    Json(IndexersResponse { indexers })
}
