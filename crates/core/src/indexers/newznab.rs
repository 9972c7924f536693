//! Newznab API family (usenet indexers, JSON output).
//!
//! Talks the standard newznab `/api` endpoint with `o=json`. Newznab has
//! no "no results" error code: an empty channel is the no-results shape,
//! so every reported error code is a hard failure for this family.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
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

/// Page size used when a search asks for more results than one request
/// returns; the fetch loops over offsets and reports one sub-query per
/// page.
const PAGE_SIZE: u32 = 100;

/// Parser for newznab JSON payloads.
pub struct NewznabParser {
    definition: IndexerDefinition,
}

impl NewznabParser {
    pub fn new(definition: IndexerDefinition) -> Self {
        Self { definition }
    }

    fn map_release(&self, item: NewznabItem) -> Release {
        let attr = |name: &str| -> Option<&str> {
            item.attributes
                .iter()
                .find(|a| a.attributes.name == name)
                .map(|a| a.attributes.value.as_str())
        };

        let categories: Vec<u32> = item
            .attributes
            .iter()
            .filter(|a| a.attributes.name == "category")
            .filter_map(|a| a.attributes.value.parse().ok())
            .collect();

        let size = attr("size")
            .and_then(|s| s.parse().ok())
            .or_else(|| {
                item.enclosure
                    .as_ref()
                    .and_then(|e| e.attributes.length.as_deref())
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(0);

        // Newznab reports bare imdb ids without the tt prefix.
        let imdb_id = attr("imdb").map(|id| format!("tt{id}"));
        let tvdb_id = attr("tvdbid").and_then(|s| s.parse().ok());
        let tvrage_id = attr("rageid").and_then(|s| s.parse().ok());

        let download_url = item
            .enclosure
            .and_then(|e| e.attributes.url)
            .or_else(|| item.link.clone());

        let guid = item
            .guid
            .or_else(|| download_url.clone())
            .unwrap_or_else(|| item.title.clone());

        Release {
            guid,
            title: item.title,
            size,
            download_url,
            info_url: item.link,
            publish_date: item
                .pub_date
                .as_deref()
                .and_then(parse_pubdate)
                .unwrap_or_else(Utc::now),
            seeders: None,
            leechers: None,
            categories,
            download_volume_factor: None,
            upload_volume_factor: None,
            imdb_id,
            tvdb_id,
            tvrage_id,
            indexer_id: self.definition.id,
            indexer: self.definition.name.clone(),
            protocol: DownloadProtocol::Usenet,
        }
    }
}

impl ResponseParser for NewznabParser {
    fn parse(&self, response: &IndexerResponse) -> Result<Vec<Release>, IndexerError> {
        if response.status != 200 {
            return Err(IndexerError::UnexpectedStatus(response.status));
        }

        let payload: NewznabResponse = serde_json::from_str(&response.body)
            .map_err(|e| IndexerError::Parse(e.to_string()))?;

        if let Some(error) = payload.error {
            let code = error.attributes.code.parse().unwrap_or(-1);
            return Err(IndexerError::Api {
                code,
                message: error.attributes.description.unwrap_or_default(),
            });
        }

        let items = match payload.channel.and_then(|c| c.item) {
            Some(OneOrMany::Many(items)) => items,
            Some(OneOrMany::One(item)) => vec![*item],
            None => return Ok(Vec::new()),
        };

        Ok(items.into_iter().map(|i| self.map_release(i)).collect())
    }
}

/// Newznab pubDate is RFC 2822; some servers omit the zone, in which
/// case the server's documented zone is UTC.
fn parse_pubdate(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

fn default_capabilities() -> IndexerCapabilities {
    let categories = CategoryMapping::new(vec![
        IndexerCategory::new(canonical::CONSOLE, "Console"),
        IndexerCategory::new(canonical::MOVIES, "Movies").with_subcategories(vec![
            IndexerCategory::new(canonical::MOVIES_SD, "Movies/SD"),
            IndexerCategory::new(canonical::MOVIES_HD, "Movies/HD"),
            IndexerCategory::new(canonical::MOVIES_UHD, "Movies/UHD"),
        ]),
        IndexerCategory::new(canonical::AUDIO, "Audio").with_subcategories(vec![
            IndexerCategory::new(canonical::AUDIO_MP3, "Audio/MP3"),
            IndexerCategory::new(canonical::AUDIO_LOSSLESS, "Audio/Lossless"),
        ]),
        IndexerCategory::new(canonical::PC, "PC"),
        IndexerCategory::new(canonical::TV, "TV").with_subcategories(vec![
            IndexerCategory::new(canonical::TV_SD, "TV/SD"),
            IndexerCategory::new(canonical::TV_HD, "TV/HD"),
            IndexerCategory::new(canonical::TV_UHD, "TV/UHD"),
        ]),
        IndexerCategory::new(canonical::BOOKS, "Books").with_subcategories(vec![
            IndexerCategory::new(canonical::BOOKS_EBOOK, "Books/EBook"),
        ]),
        IndexerCategory::new(canonical::OTHER, "Other"),
    ]);

    IndexerCapabilities { categories }
}

/// A newznab-family indexer.
pub struct NewznabIndexer {
    definition: IndexerDefinition,
    parser: NewznabParser,
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewznabIndexer {
    pub fn new(
        id: i32,
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Self {
        let definition = IndexerDefinition {
            id,
            name: name.into(),
            protocol: DownloadProtocol::Usenet,
            capabilities: default_capabilities(),
        };
        Self {
            parser: NewznabParser::new(definition.clone()),
            definition,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn build_search_url(&self, criteria: &SearchCriteria, limit: u32, offset: u32) -> String {
        let mut url = format!(
            "{}/api?t={}&apikey={}&o=json&limit={}&offset={}",
            self.base_url,
            criteria.search_type(),
            urlencoding::encode(&self.api_key),
            limit,
            offset,
        );

        if let Some(term) = &criteria.term {
            if !term.is_empty() {
                url.push_str("&q=");
                url.push_str(&urlencoding::encode(term));
            }
        }

        if !criteria.categories.is_empty() {
            let cats: Vec<String> = criteria.categories.iter().map(|c| c.to_string()).collect();
            url.push_str("&cat=");
            url.push_str(&cats.join(","));
        }

        match &criteria.kind {
            SearchKind::Basic => {}
            SearchKind::Movie { imdb_id, year, .. } => {
                if let Some(imdb) = imdb_id {
                    url.push_str("&imdbid=");
                    url.push_str(&urlencoding::encode(imdb.trim_start_matches("tt")));
                }
                if let Some(year) = year {
                    url.push_str(&format!("&year={year}"));
                }
            }
            SearchKind::Tv {
                season,
                episode,
                tvdb_id,
                rid,
                ..
            } => {
                if let Some(tvdb) = tvdb_id {
                    url.push_str(&format!("&tvdbid={tvdb}"));
                }
                if let Some(rid) = rid {
                    url.push_str(&format!("&rid={rid}"));
                }
                if let Some(season) = season {
                    url.push_str(&format!("&season={season}"));
                }
                if let Some(episode) = episode {
                    url.push_str(&format!("&ep={episode}"));
                }
            }
            SearchKind::Music {
                artist,
                album,
                label,
            } => {
                if let Some(artist) = artist {
                    url.push_str("&artist=");
                    url.push_str(&urlencoding::encode(artist));
                }
                if let Some(album) = album {
                    url.push_str("&album=");
                    url.push_str(&urlencoding::encode(album));
                }
                if let Some(label) = label {
                    url.push_str("&label=");
                    url.push_str(&urlencoding::encode(label));
                }
            }
            SearchKind::Book { author, title } => {
                if let Some(author) = author {
                    url.push_str("&author=");
                    url.push_str(&urlencoding::encode(author));
                }
                if let Some(title) = title {
                    url.push_str("&title=");
                    url.push_str(&urlencoding::encode(title));
                }
            }
        }

        url
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Release>, QueryTelemetry), IndexerError> {
        let url = self.build_search_url(criteria, limit, offset);
        debug!(indexer = %self.definition.name, %url, "querying newznab API");

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
        Ok((releases, telemetry))
    }
}

#[async_trait]
impl Indexer for NewznabIndexer {
    fn definition(&self) -> &IndexerDefinition {
        &self.definition
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<FetchResult, IndexerError> {
        let wanted = criteria.limit.unwrap_or(PAGE_SIZE);
        let start_offset = criteria.offset.unwrap_or(0);

        let mut result = FetchResult::default();
        let mut offset = start_offset;

        while (result.releases.len() as u32) < wanted {
            let page_limit = PAGE_SIZE.min(wanted - result.releases.len() as u32);
            let (mut releases, telemetry) = self.fetch_page(criteria, page_limit, offset).await?;
            let page_count = releases.len() as u32;

            result.releases.append(&mut releases);
            result.queries.push(telemetry);

            // A short page means the indexer ran out of results.
            if page_count < page_limit {
                break;
            }
            offset += page_count;
        }

        Ok(result)
    }
}

// Newznab JSON output shapes. Single-element collections arrive as a
// bare object instead of an array, hence OneOrMany.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(Box<T>),
    Many(Vec<T>),
}

#[derive(Debug, Deserialize)]
struct NewznabResponse {
    error: Option<NewznabError>,
    channel: Option<NewznabChannel>,
}

#[derive(Debug, Deserialize)]
struct NewznabError {
    #[serde(rename = "@attributes")]
    attributes: NewznabErrorAttributes,
}

#[derive(Debug, Deserialize)]
struct NewznabErrorAttributes {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewznabChannel {
    item: Option<OneOrMany<NewznabItem>>,
}

#[derive(Debug, Deserialize)]
struct NewznabItem {
    title: String,
    guid: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    enclosure: Option<NewznabEnclosure>,
    #[serde(default, rename = "attr")]
    attributes: Vec<NewznabAttr>,
}

#[derive(Debug, Deserialize)]
struct NewznabEnclosure {
    #[serde(rename = "@attributes")]
    attributes: NewznabEnclosureAttributes,
}

#[derive(Debug, Deserialize)]
struct NewznabEnclosureAttributes {
    url: Option<String>,
    length: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewznabAttr {
    #[serde(rename = "@attributes")]
    attributes: NewznabAttrAttributes,
}

#[derive(Debug, Deserialize)]
struct NewznabAttrAttributes {
    name: String,
    value: String,
}
