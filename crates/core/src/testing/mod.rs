//! Testing utilities and mock implementations.
//!
//! Mock implementations of the indexer and quota traits, allowing the
//! dispatch engine and HTTP layer to be exercised without real
//! indexers.
//!
//! # Example
//!
//! ```rust,ignore
//! use dragnet_core::testing::{fixtures, MockIndexer, MockLimiter};
//! use dragnet_core::DownloadProtocol;
//!
//! let indexer = MockIndexer::new(1, "mock", DownloadProtocol::Torrent)
//!     .with_releases(vec![fixtures::release("g-1", "A Release", &[2000])]);
//! let limiter = MockLimiter::unlimited();
//!
//! // Use in SearchService...
//! ```

mod mock_indexer;

pub use mock_indexer::MockIndexer;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::indexers::IndexerDefinition;
use crate::limits::QueryLimiter;

/// A limiter with a fixed set of over-quota indexer ids.
pub struct MockLimiter {
    limited: HashSet<i32>,
}

impl MockLimiter {
    /// Every indexer is under quota.
    pub fn unlimited() -> Self {
        Self {
            limited: HashSet::new(),
        }
    }

    /// The given indexer ids are permanently over quota.
    pub fn limiting(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            limited: ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl QueryLimiter for MockLimiter {
    async fn at_query_limit(&self, definition: &IndexerDefinition) -> bool {
        self.limited.contains(&definition.id)
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::indexers::{DownloadProtocol, Release};

    /// Create a test release with reasonable defaults.
    pub fn release(guid: &str, title: &str, categories: &[u32]) -> Release {
        Release {
            guid: guid.to_string(),
            title: title.to_string(),
            size: 1024 * 1024 * 700, // 700 MB
            download_url: Some(format!("https://mock.example/download/{guid}")),
            info_url: None,
            publish_date: Utc::now(),
            seeders: Some(50),
            leechers: Some(10),
            categories: categories.to_vec(),
            download_volume_factor: None,
            upload_volume_factor: None,
            imdb_id: None,
            tvdb_id: None,
            tvrage_id: None,
            indexer_id: 0,
            indexer: "mock".to_string(),
            protocol: DownloadProtocol::Torrent,
        }
    }
}
