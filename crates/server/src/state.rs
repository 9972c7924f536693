use std::sync::Arc;

use dragnet_core::limits::QueryLimitService;
use dragnet_core::{Config, HistoryStore, IndexerRegistry, SanitizedConfig, SearchService};

/// Shared application state
pub struct AppState {
    config: Config,
    search: Arc<SearchService>,
    registry: Arc<dyn IndexerRegistry>,
    limiter: Arc<QueryLimitService>,
    history: Arc<dyn HistoryStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        search: Arc<SearchService>,
        registry: Arc<dyn IndexerRegistry>,
        limiter: Arc<QueryLimitService>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            search,
            registry,
            limiter,
            history,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn search(&self) -> &SearchService {
        &self.search
    }

    pub fn registry(&self) -> &dyn IndexerRegistry {
        self.registry.as_ref()
    }

    pub fn limiter(&self) -> &QueryLimitService {
        &self.limiter
    }

    pub fn history(&self) -> &dyn HistoryStore {
        self.history.as_ref()
    }
}
