//! Registry of available indexers.

use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::config::{IndexerConfig, IndexerFamily};

use super::{Indexer, NewznabIndexer, RarbgIndexer};

/// Supplies the set of indexers a dispatch may fan out to.
pub trait IndexerRegistry: Send + Sync {
    fn available(&self) -> Vec<Arc<dyn Indexer>>;
}

/// Registry backed by the static indexer list from configuration.
pub struct StaticRegistry {
    indexers: Vec<Arc<dyn Indexer>>,
}

impl StaticRegistry {
    pub fn new(indexers: Vec<Arc<dyn Indexer>>) -> Self {
        Self { indexers }
    }

    /// Build the configured indexers, sharing one HTTP client. Disabled
    /// entries are skipped.
    pub fn from_config(configs: &[IndexerConfig], client: Client) -> Self {
        let mut indexers: Vec<Arc<dyn Indexer>> = Vec::new();

        for config in configs.iter().filter(|c| c.enabled) {
            let indexer: Arc<dyn Indexer> = match config.family {
                IndexerFamily::Rarbg => Arc::new(RarbgIndexer::new(
                    config.id,
                    &config.name,
                    &config.url,
                    client.clone(),
                )),
                IndexerFamily::Newznab => Arc::new(NewznabIndexer::new(
                    config.id,
                    &config.name,
                    &config.url,
                    config.api_key.as_deref().unwrap_or_default(),
                    client.clone(),
                )),
            };
            info!(
                indexer = %config.name,
                id = config.id,
                family = ?config.family,
                "registered indexer"
            );
            indexers.push(indexer);
        }

        Self { indexers }
    }
}

impl IndexerRegistry for StaticRegistry {
    fn available(&self) -> Vec<Arc<dyn Indexer>> {
        self.indexers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexers::DownloadProtocol;

    #[test]
    fn test_from_config_skips_disabled() {
        let configs = vec![
            IndexerConfig {
                id: 1,
                name: "rarbg".to_string(),
                family: IndexerFamily::Rarbg,
                url: "http://localhost:1".to_string(),
                api_key: None,
                queries_per_minute: None,
                enabled: true,
            },
            IndexerConfig {
                id: 2,
                name: "dead".to_string(),
                family: IndexerFamily::Newznab,
                url: "http://localhost:2".to_string(),
                api_key: Some("key".to_string()),
                queries_per_minute: None,
                enabled: false,
            },
        ];

        let registry = StaticRegistry::from_config(&configs, Client::new());
        let available = registry.available();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].definition().id, 1);
        assert_eq!(available[0].protocol(), DownloadProtocol::Torrent);
    }
}
