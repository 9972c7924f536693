use std::collections::HashSet;

use super::{types::Config, ConfigError, IndexerFamily};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Indexer ids are positive and unique
/// - Indexer URLs are non-empty
/// - Newznab indexers carry an API key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for indexer in &config.indexers {
        if indexer.id <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "indexer '{}' has non-positive id {}, ids below 1 are reserved",
                indexer.name, indexer.id
            )));
        }
        if !seen_ids.insert(indexer.id) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate indexer id {}",
                indexer.id
            )));
        }
        if indexer.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "indexer '{}' has an empty url",
                indexer.name
            )));
        }
        if indexer.family == IndexerFamily::Newznab
            && indexer.api_key.as_ref().is_none_or(|k| k.is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "newznab indexer '{}' requires an api_key",
                indexer.name
            )));
        }
    }

    Ok(())
}
