//! Common test utilities for in-process API testing.
//!
//! Provides a test fixture that assembles the full router with mock
//! indexers and an in-memory history store, so API behavior can be
//! exercised without real indexers or a server process.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dragnet_core::limits::QueryLimitService;
use dragnet_core::testing::MockLimiter;
use dragnet_core::{
    create_history_system, load_config_from_str, HistoryStore, Indexer, QueryLimiter,
    SearchService, SqliteHistoryStore, StaticRegistry,
};

/// Re-export fixtures for test convenience
pub use dragnet_core::testing::fixtures;

/// In-process server with mock indexers.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The history store backing the /history endpoint
    pub history: Arc<dyn HistoryStore>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture where every indexer is under quota.
    pub fn new(indexers: Vec<Arc<dyn Indexer>>) -> Self {
        Self::with_limiter(indexers, Arc::new(MockLimiter::unlimited()))
    }

    /// Create a fixture with the given quota decisions.
    pub fn with_limiter(indexers: Vec<Arc<dyn Indexer>>, limiter: Arc<dyn QueryLimiter>) -> Self {
        let config = load_config_from_str("").unwrap();

        let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::in_memory().unwrap());
        let (events, writer) = create_history_system(Arc::clone(&history), 100);
        tokio::spawn(writer.run());

        let registry = Arc::new(StaticRegistry::new(indexers));
        let search = Arc::new(SearchService::new(
            Arc::clone(&registry) as Arc<dyn dragnet_core::IndexerRegistry>,
            limiter,
            events,
        ));

        let state = Arc::new(dragnet_server::AppState::new(
            config,
            search,
            registry,
            Arc::new(QueryLimitService::unlimited()),
            Arc::clone(&history),
        ));

        Self {
            router: dragnet_server::create_router(state),
            history,
        }
    }

    /// Issue a GET request and parse the JSON response body.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Issue a GET request and return the raw response body as text.
    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }
}
