//! Typed search specifications built from inbound requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel indexer id meaning "every usenet indexer".
pub const ALL_USENET: i32 = -1;
/// Sentinel indexer id meaning "every torrent indexer".
pub const ALL_TORRENT: i32 = -2;

/// A normalized search specification. Built once per inbound request by
/// the search router and read-only from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Requested canonical category ids. Empty means all categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Opaque provenance reported by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Explicitly requested indexer ids. Empty means all available.
    /// May contain the [`ALL_USENET`] / [`ALL_TORRENT`] sentinels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexer_ids: Vec<i32>,
    /// Whether a user triggered this search, as opposed to automation.
    #[serde(default)]
    pub interactive: bool,
    pub kind: SearchKind,
}

/// The active search-type variant. Exactly one per search; variant
/// fields stay `None` unless the inbound request supplied them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchKind {
    Basic,
    Movie {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imdb_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tmdb_id: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trakt_id: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        year: Option<u32>,
    },
    Tv {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        season: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        episode: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tvdb_id: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imdb_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trakt_id: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rid: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tvmaze_id: Option<u32>,
    },
    Music {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artist: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        album: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Book {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

impl SearchKind {
    pub fn search_type(&self) -> &'static str {
        match self {
            SearchKind::Basic => "search",
            SearchKind::Movie { .. } => "movie",
            SearchKind::Tv { .. } => "tvsearch",
            SearchKind::Music { .. } => "music",
            SearchKind::Book { .. } => "book",
        }
    }
}

impl SearchCriteria {
    /// A criteria with only a free-text term, everything else default.
    /// Mostly useful in tests.
    pub fn basic(term: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            categories: Vec::new(),
            limit: None,
            offset: None,
            source: None,
            host: None,
            indexer_ids: Vec::new(),
            interactive: false,
            kind: SearchKind::Basic,
        }
    }

    pub fn search_type(&self) -> &'static str {
        self.kind.search_type()
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] '{}'",
            self.search_type(),
            self.term.as_deref().unwrap_or("")
        )
    }
}
