pub mod config;
pub mod history;
pub mod indexers;
pub mod limits;
pub mod search;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, IndexerConfig,
    IndexerFamily, SanitizedConfig,
};
pub use history::{
    create_history_system, HistoryError, HistoryFilter, HistoryStore, HistoryWriter, QueryEvent,
    QueryEventHandle, QueryRecord, SqliteHistoryStore,
};
pub use indexers::{
    DownloadProtocol, Indexer, IndexerDefinition, IndexerError, IndexerRegistry, Release,
    StaticRegistry,
};
pub use limits::{QueryLimitService, QueryLimiter};
pub use search::{SearchCriteria, SearchError, SearchRequest, SearchResults, SearchService};
