use serde::Deserialize;

use super::SearchError;

/// Raw query-string parameters of an inbound search request, newznab
/// style. Everything is optional; the router fills in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Search type: "search", "movie", "tvsearch", "music", "book".
    pub t: Option<String>,
    /// Free-text query term.
    pub q: Option<String>,
    /// Comma-separated canonical category ids.
    pub cat: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Caller-reported provenance, e.g. the app name.
    pub source: Option<String>,
    pub host: Option<String>,

    // Movie parameters
    pub imdbid: Option<String>,
    pub tmdbid: Option<u32>,
    pub traktid: Option<u32>,
    pub year: Option<u32>,

    // TV parameters
    pub tvdbid: Option<u32>,
    pub rid: Option<u32>,
    pub tvmazeid: Option<u32>,
    pub season: Option<u32>,
    pub ep: Option<u32>,

    // Music parameters
    pub artist: Option<String>,
    pub album: Option<String>,
    pub label: Option<String>,

    // Book parameters
    pub author: Option<String>,
    pub title: Option<String>,
}

/// Parse a comma-separated category list, skipping blank entries.
pub fn parse_categories(cat: &str) -> Result<Vec<u32>, SearchError> {
    let mut categories = Vec::new();
    for part in cat.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse::<u32>()
            .map_err(|_| SearchError::InvalidCategory(part.to_string()))?;
        categories.push(id);
    }
    Ok(categories)
}
