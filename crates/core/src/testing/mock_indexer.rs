//! Mock indexer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::indexers::canonical;
use crate::indexers::{
    CategoryMapping, DownloadProtocol, FetchResult, Indexer, IndexerCapabilities,
    IndexerCategory, IndexerDefinition, IndexerError, QueryTelemetry, Release,
};
use crate::search::SearchCriteria;

/// Mock implementation of the Indexer trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable releases, split across a configurable number
///   of sub-queries
/// - Simulate API failures, delays and panics
/// - Record the criteria it was queried with, for assertions
pub struct MockIndexer {
    definition: IndexerDefinition,
    releases: Vec<Release>,
    error: Option<(i32, String)>,
    delay: Option<Duration>,
    panics: bool,
    pages: u32,
    criteria_seen: Arc<RwLock<Vec<SearchCriteria>>>,
}

impl MockIndexer {
    pub fn new(id: i32, name: &str, protocol: DownloadProtocol) -> Self {
        Self {
            definition: IndexerDefinition {
                id,
                name: name.to_string(),
                protocol,
                capabilities: default_capabilities(),
            },
            releases: Vec::new(),
            error: None,
            delay: None,
            panics: false,
            pages: 1,
            criteria_seen: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_capabilities(mut self, capabilities: IndexerCapabilities) -> Self {
        self.definition.capabilities = capabilities;
        self
    }

    pub fn with_releases(mut self, releases: Vec<Release>) -> Self {
        self.releases = releases;
        self
    }

    /// Make every fetch fail with the given API error.
    pub fn with_error(mut self, code: i32, message: &str) -> Self {
        self.error = Some((code, message.to_string()));
        self
    }

    /// Delay every fetch, for concurrency and cancellation tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every fetch panic, for failure isolation tests.
    pub fn with_panic(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Report the configured releases split across this many sub-queries.
    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = pages.max(1);
        self
    }

    /// The criteria this indexer has been queried with so far.
    pub async fn criteria_seen(&self) -> Vec<SearchCriteria> {
        self.criteria_seen.read().await.clone()
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    fn definition(&self) -> &IndexerDefinition {
        &self.definition
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<FetchResult, IndexerError> {
        self.criteria_seen.write().await.push(criteria.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics {
            panic!("mock indexer '{}' panicked", self.definition.name);
        }

        if let Some((code, message)) = &self.error {
            return Err(IndexerError::Api {
                code: *code,
                message: message.clone(),
            });
        }

        let releases = self.releases.clone();
        let per_page = releases.len().div_ceil(self.pages as usize).max(1);
        let queries = (0..self.pages)
            .map(|page| QueryTelemetry {
                url: format!(
                    "https://mock.example/api?q={}&page={}",
                    criteria.term.as_deref().unwrap_or(""),
                    page
                ),
                status: 200,
                elapsed_ms: 10,
                item_count: releases
                    .iter()
                    .skip(page as usize * per_page)
                    .take(per_page)
                    .count() as u32,
            })
            .collect();

        Ok(FetchResult { releases, queries })
    }
}

/// A capability set declaring the common canonical groups with their
/// usual subcategories.
fn default_capabilities() -> IndexerCapabilities {
    IndexerCapabilities {
        categories: CategoryMapping::new(vec![
            IndexerCategory::new(canonical::MOVIES, "Movies").with_subcategories(vec![
                IndexerCategory::new(canonical::MOVIES_SD, "Movies/SD"),
                IndexerCategory::new(canonical::MOVIES_HD, "Movies/HD"),
                IndexerCategory::new(canonical::MOVIES_UHD, "Movies/UHD"),
            ]),
            IndexerCategory::new(canonical::TV, "TV").with_subcategories(vec![
                IndexerCategory::new(canonical::TV_SD, "TV/SD"),
                IndexerCategory::new(canonical::TV_HD, "TV/HD"),
                IndexerCategory::new(canonical::TV_UHD, "TV/UHD"),
            ]),
            IndexerCategory::new(canonical::AUDIO, "Audio").with_subcategories(vec![
                IndexerCategory::new(canonical::AUDIO_MP3, "Audio/MP3"),
                IndexerCategory::new(canonical::AUDIO_LOSSLESS, "Audio/Lossless"),
            ]),
            IndexerCategory::new(canonical::OTHER, "Other"),
        ]),
    }
}
