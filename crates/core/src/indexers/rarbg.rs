//! Rarbg-style torrent API family (torrentapi JSON endpoint).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use crate::search::{SearchCriteria, SearchKind};

use super::{
    canonical, CategoryMapping, DownloadProtocol, FetchResult, Indexer, IndexerCapabilities,
    IndexerCategory, IndexerDefinition, IndexerError, IndexerResponse, QueryTelemetry, Release,
    ResponseParser,
};

/// Error codes the API uses for "nothing found" rather than a real
/// failure: 20 = no results, 8/9/10 = imdb/tvdb/themoviedb id not found.
/// This allow-list is specific to this family; other families must
/// derive their own from their API's documentation.
const BENIGN_ERROR_CODES: [i32; 4] = [20, 8, 9, 10];

static BTIH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^magnet:\?xt=urn:btih:([a-f0-9]+)").unwrap());

/// Parser for the rarbg JSON payload shape.
pub struct RarbgParser {
    definition: IndexerDefinition,
}

impl RarbgParser {
    pub fn new(definition: IndexerDefinition) -> Self {
        Self { definition }
    }

    fn map_release(&self, torrent: RarbgTorrent) -> Release {
        let categories = self
            .definition
            .capabilities
            .categories
            .map_native_category(torrent.category.as_deref().unwrap_or(""));

        let (imdb_id, tvdb_id, tvrage_id) = match torrent.episode_info {
            Some(info) => (info.imdb, info.tvdb, info.tvrage),
            None => (None, None, None),
        };

        Release {
            guid: release_guid(&torrent.download),
            title: torrent.title,
            size: torrent.size.unwrap_or(0),
            info_url: torrent.info_page,
            publish_date: torrent
                .pubdate
                .as_deref()
                .and_then(parse_pubdate)
                .unwrap_or_else(Utc::now),
            seeders: torrent.seeders,
            leechers: torrent.leechers,
            categories,
            download_url: Some(torrent.download),
            // Rarbg torrents are freeleech.
            download_volume_factor: Some(0.0),
            upload_volume_factor: Some(1.0),
            imdb_id,
            tvdb_id,
            tvrage_id,
            indexer_id: self.definition.id,
            indexer: self.definition.name.clone(),
            protocol: DownloadProtocol::Torrent,
        }
    }
}

impl ResponseParser for RarbgParser {
    fn parse(&self, response: &IndexerResponse) -> Result<Vec<Release>, IndexerError> {
        if response.status != 200 {
            return Err(IndexerError::UnexpectedStatus(response.status));
        }

        let payload: RarbgResponse = serde_json::from_str(&response.body)
            .map_err(|e| IndexerError::Parse(e.to_string()))?;

        if let Some(code) = payload.error_code {
            if BENIGN_ERROR_CODES.contains(&code) {
                return Ok(Vec::new());
            }
            return Err(IndexerError::Api {
                code,
                message: payload.error.unwrap_or_default(),
            });
        }

        let Some(torrents) = payload.torrent_results else {
            return Ok(Vec::new());
        };

        Ok(torrents.into_iter().map(|t| self.map_release(t)).collect())
    }
}

/// Derive the release guid from the info hash embedded in the magnet
/// link, falling back to the raw download locator.
fn release_guid(download: &str) -> String {
    match BTIH_RE.captures(download) {
        Some(captures) => format!("rarbg-{}", &captures[1]),
        None => format!("rarbg-{}", download),
    }
}

/// Timestamps come as "2024-06-15 10:30:00 +0000"; a naive timestamp is
/// documented to be UTC.
fn parse_pubdate(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

fn default_capabilities() -> IndexerCapabilities {
    let categories = CategoryMapping::new(vec![
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
        IndexerCategory::new(canonical::BOOKS, "Books"),
    ])
    .map_native("Movies/XVID", canonical::MOVIES_SD)
    .map_native("Movies/x264", canonical::MOVIES_SD)
    .map_native("Movies/x264/720", canonical::MOVIES_HD)
    .map_native("Movies/x264/1080", canonical::MOVIES_HD)
    .map_native("Movies/x264/4k", canonical::MOVIES_UHD)
    .map_native("Movies/x265/4k", canonical::MOVIES_UHD)
    .map_native("TV Episodes", canonical::TV_SD)
    .map_native("TV HD Episodes", canonical::TV_HD)
    .map_native("TV UHD Episodes", canonical::TV_UHD)
    .map_native("Music/MP3", canonical::AUDIO_MP3)
    .map_native("Music/FLAC", canonical::AUDIO_LOSSLESS)
    .map_native("e-Books", canonical::BOOKS);

    IndexerCapabilities { categories }
}

/// A rarbg-family indexer: builds the torrentapi query, performs the
/// request and parses the response.
pub struct RarbgIndexer {
    definition: IndexerDefinition,
    parser: RarbgParser,
    client: Client,
    base_url: String,
}

impl RarbgIndexer {
    pub fn new(id: i32, name: impl Into<String>, base_url: impl Into<String>, client: Client) -> Self {
        let definition = IndexerDefinition {
            id,
            name: name.into(),
            protocol: DownloadProtocol::Torrent,
            capabilities: default_capabilities(),
        };
        Self {
            parser: RarbgParser::new(definition.clone()),
            definition,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_search_url(&self, criteria: &SearchCriteria) -> String {
        let mut url = format!("{}/pubapi_v2.php?format=json_extended", self.base_url);

        // Prefer id-based lookup when the caller supplied one; the API
        // treats search_imdb/search_tvdb as alternatives to search_string.
        let id_param = match &criteria.kind {
            SearchKind::Movie {
                imdb_id: Some(imdb),
                ..
            } => Some(format!("&mode=search&search_imdb={}", urlencoding::encode(imdb))),
            SearchKind::Tv {
                tvdb_id: Some(tvdb),
                ..
            } => Some(format!("&mode=search&search_tvdb={tvdb}")),
            _ => None,
        };

        match id_param {
            Some(param) => url.push_str(&param),
            None => match &criteria.term {
                Some(term) if !term.is_empty() => {
                    url.push_str("&mode=search&search_string=");
                    url.push_str(&urlencoding::encode(term));
                }
                _ => url.push_str("&mode=list"),
            },
        }

        if let Some(limit) = criteria.limit {
            // The API caps page sizes at 100.
            url.push_str(&format!("&limit={}", limit.min(100)));
        }

        url
    }
}

#[async_trait]
impl Indexer for RarbgIndexer {
    fn definition(&self) -> &IndexerDefinition {
        &self.definition
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<FetchResult, IndexerError> {
        let url = self.build_search_url(criteria);
        debug!(indexer = %self.definition.name, %url, "querying rarbg API");

        let started = Instant::now();
        let http_response = self.client.get(&url).send().await?;
        let status = http_response.status().as_u16();
        let body = http_response.text().await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = IndexerResponse {
            url: url.clone(),
            status,
            body,
        };
        let releases = self.parser.parse(&response)?;

        let telemetry = QueryTelemetry {
            url,
            status,
            elapsed_ms,
            item_count: releases.len() as u32,
        };

        Ok(FetchResult {
            releases,
            queries: vec![telemetry],
        })
    }
}


// torrentapi response shapes
#[derive(Debug, Deserialize)]
struct RarbgResponse {
    error: Option<String>,
    error_code: Option<i32>,
    torrent_results: Option<Vec<RarbgTorrent>>,
}

#[derive(Debug, Deserialize)]
struct RarbgTorrent {
    title: String,
    category: Option<String>,
    download: String,
    seeders: Option<u32>,
    leechers: Option<u32>,
    size: Option<u64>,
    pubdate: Option<String>,
    info_page: Option<String>,
    episode_info: Option<RarbgEpisodeInfo>,
}

#[derive(Debug, Deserialize)]
struct RarbgEpisodeInfo {
    imdb: Option<String>,
    tvdb: Option<u32>,
    tvrage: Option<u32>,
}
