//! The canonical release model every indexer parser produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DownloadProtocol;

/// A normalized content release, independent of which indexer family
/// reported it.
///
/// The guid is deterministically derived from indexer-stable data (a
/// content hash embedded in the download url where available), so the
/// same underlying release yields the same guid across repeated
/// searches. Instances are created once by a parser and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Stable unique identifier within the indexer.
    pub guid: String,
    pub title: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_url: Option<String>,
    pub publish_date: DateTime<Utc>,
    /// Torrent-only swarm counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leechers: Option<u32>,
    /// Canonical category ids. Empty means uncategorized, which is never
    /// a reason to drop the release during filtering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_volume_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_volume_factor: Option<f64>,
    /// Cross-reference ids, populated only when the indexer supplied them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvrage_id: Option<u32>,
    /// Which indexer produced this release.
    pub indexer_id: i32,
    pub indexer: String,
    pub protocol: DownloadProtocol,
}
