use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    parse_categories, SearchCriteria, SearchError, SearchKind, SearchRequest, SearchResults,
    ALL_TORRENT, ALL_USENET,
};
use crate::history::{QueryEvent, QueryEventHandle};
use crate::indexers::{Indexer, IndexerRegistry};
use crate::limits::QueryLimiter;

/// Routes inbound search requests to the configured indexers.
///
/// Every selected indexer is queried on its own task. Quota-exhausted
/// indexers are skipped silently, failing ones are logged and recorded
/// in the history, and neither affects the siblings' results.
pub struct SearchService {
    registry: Arc<dyn IndexerRegistry>,
    limiter: Arc<dyn QueryLimiter>,
    events: QueryEventHandle,
}

impl SearchService {
    pub fn new(
        registry: Arc<dyn IndexerRegistry>,
        limiter: Arc<dyn QueryLimiter>,
        events: QueryEventHandle,
    ) -> Self {
        Self {
            registry,
            limiter,
            events,
        }
    }

    /// Run a search to completion.
    pub async fn search(
        &self,
        request: &SearchRequest,
        indexer_ids: Vec<i32>,
        interactive: bool,
    ) -> Result<SearchResults, SearchError> {
        self.search_with_cancel(request, indexer_ids, interactive, CancellationToken::new())
            .await
    }

    /// Run a search that stops early when `cancel` fires.
    ///
    /// Cancellation is cooperative: in-flight indexer fetches are
    /// abandoned and recorded as failures, already-finished ones keep
    /// their contribution.
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        indexer_ids: Vec<i32>,
        interactive: bool,
        cancel: CancellationToken,
    ) -> Result<SearchResults, SearchError> {
        let criteria = build_criteria(request, indexer_ids, interactive)?;
        Ok(self.dispatch(criteria, cancel).await)
    }

    async fn dispatch(&self, criteria: SearchCriteria, cancel: CancellationToken) -> SearchResults {
        let mut indexers = self.registry.available();
        indexers.retain(|indexer| selected(&criteria.indexer_ids, indexer.as_ref()));

        debug!(
            search_type = criteria.search_type(),
            indexers = indexers.len(),
            "Dispatching search"
        );

        let criteria = Arc::new(criteria);
        let mut handles = Vec::with_capacity(indexers.len());
        for indexer in indexers {
            let definition = indexer.definition();
            let identity = (definition.id, definition.name.clone());
            let criteria = Arc::clone(&criteria);
            let limiter = Arc::clone(&self.limiter);
            let events = self.events.clone();
            let cancel = cancel.clone();
            let handle = tokio::spawn(async move {
                dispatch_indexer(indexer, criteria, limiter, events, cancel).await
            });
            handles.push((identity, handle));
        }

        let mut releases = Vec::new();
        for ((indexer_id, indexer), handle) in handles {
            match handle.await {
                Ok(mut contribution) => releases.append(&mut contribution),
                // A panicking indexer contributes nothing; record the
                // failure like any other fetch error
                Err(e) => {
                    warn!(indexer = %indexer, "Indexer task failed: {}", e);
                    self.events.try_emit(QueryEvent {
                        indexer_id,
                        indexer,
                        criteria: (*criteria).clone(),
                        telemetry: None,
                    });
                }
            }
        }

        SearchResults { releases }
    }
}

/// Whether an indexer is selected by the requested id list.
///
/// An empty list selects everything. The [`ALL_USENET`] and
/// [`ALL_TORRENT`] sentinels select every indexer of that protocol.
fn selected(indexer_ids: &[i32], indexer: &dyn Indexer) -> bool {
    if indexer_ids.is_empty() {
        return true;
    }
    let definition = indexer.definition();
    indexer_ids.contains(&definition.id)
        || (indexer_ids.contains(&ALL_USENET) && definition.protocol.is_usenet())
        || (indexer_ids.contains(&ALL_TORRENT) && definition.protocol.is_torrent())
}

/// Query one indexer and post-process its contribution.
///
/// Emits one history event per sub-query on success, or a single
/// telemetry-less event on failure. A quota skip emits nothing.
async fn dispatch_indexer(
    indexer: Arc<dyn Indexer>,
    criteria: Arc<SearchCriteria>,
    limiter: Arc<dyn QueryLimiter>,
    events: QueryEventHandle,
    cancel: CancellationToken,
) -> Vec<crate::indexers::Release> {
    let definition = indexer.definition();

    if limiter.at_query_limit(definition).await {
        debug!(indexer = %definition.name, "Skipping indexer, query limit reached");
        return Vec::new();
    }

    let outcome = tokio::select! {
        result = indexer.fetch(&criteria) => result,
        _ = cancel.cancelled() => Err(crate::indexers::IndexerError::Cancelled),
    };

    match outcome {
        Ok(result) => {
            let mut releases = result.releases;
            if !criteria.categories.is_empty() {
                let allowed = definition
                    .capabilities
                    .categories
                    .expand_query_categories(&criteria.categories);
                // Releases without category info always pass the filter
                releases.retain(|release| {
                    release.categories.is_empty()
                        || release.categories.iter().any(|c| allowed.contains(c))
                });
            }

            for telemetry in result.queries {
                events.try_emit(QueryEvent {
                    indexer_id: definition.id,
                    indexer: definition.name.clone(),
                    criteria: (*criteria).clone(),
                    telemetry: Some(telemetry),
                });
            }

            releases
        }
        Err(e) => {
            warn!(indexer = %definition.name, "Indexer query failed: {}", e);
            events.try_emit(QueryEvent {
                indexer_id: definition.id,
                indexer: definition.name.clone(),
                criteria: (*criteria).clone(),
                telemetry: None,
            });
            Vec::new()
        }
    }
}

/// Build typed criteria from raw request parameters.
fn build_criteria(
    request: &SearchRequest,
    indexer_ids: Vec<i32>,
    interactive: bool,
) -> Result<SearchCriteria, SearchError> {
    let categories = match request.cat.as_deref() {
        Some(cat) => parse_categories(cat)?,
        None => Vec::new(),
    };

    let kind = match request.t.as_deref() {
        Some("movie") => SearchKind::Movie {
            imdb_id: request.imdbid.clone(),
            tmdb_id: request.tmdbid,
            trakt_id: request.traktid,
            year: request.year,
        },
        Some("tvsearch") | Some("tv") => SearchKind::Tv {
            season: request.season,
            episode: request.ep,
            tvdb_id: request.tvdbid,
            imdb_id: request.imdbid.clone(),
            trakt_id: request.traktid,
            rid: request.rid,
            tvmaze_id: request.tvmazeid,
        },
        Some("music") => SearchKind::Music {
            artist: request.artist.clone(),
            album: request.album.clone(),
            label: request.label.clone(),
        },
        Some("book") => SearchKind::Book {
            author: request.author.clone(),
            title: request.title.clone(),
        },
        // Unknown types fall back to a plain text search
        _ => SearchKind::Basic,
    };

    Ok(SearchCriteria {
        term: request.q.clone(),
        categories,
        limit: request.limit,
        offset: request.offset,
        source: request.source.clone(),
        host: request.host.clone(),
        indexer_ids,
        interactive,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::history::QueryEventEnvelope;
    use crate::indexers::{DownloadProtocol, StaticRegistry};
    use crate::testing::{fixtures, MockIndexer, MockLimiter};

    fn capture_events() -> (QueryEventHandle, mpsc::Receiver<QueryEventEnvelope>) {
        let (tx, rx) = mpsc::channel(100);
        (QueryEventHandle::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<QueryEventEnvelope>) -> Vec<QueryEvent> {
        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(envelope.event);
        }
        events
    }

    fn service(
        indexers: Vec<Arc<dyn Indexer>>,
        limiter: Arc<dyn QueryLimiter>,
    ) -> (SearchService, mpsc::Receiver<QueryEventEnvelope>) {
        let (events, rx) = capture_events();
        let registry = Arc::new(StaticRegistry::new(indexers));
        (SearchService::new(registry, limiter, events), rx)
    }

    fn request(q: &str) -> SearchRequest {
        SearchRequest {
            q: Some(q.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_search_merges_all_contributions() {
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("a-1", "Stargate SG-1", &[5030])]);
        let b = MockIndexer::new(2, "beta", DownloadProtocol::Usenet).with_releases(vec![
            fixtures::release("b-1", "Stargate Atlantis", &[5040]),
            fixtures::release("b-2", "Stargate Universe", &[5040]),
        ]);

        let (service, mut rx) = service(
            vec![Arc::new(a), Arc::new(b)],
            Arc::new(MockLimiter::unlimited()),
        );

        let results = service.search(&request("stargate"), vec![], false).await.unwrap();
        assert_eq!(results.releases.len(), 3);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.successful()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_indexers_are_queried_concurrently() {
        let delay = Duration::from_millis(100);
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("a-1", "One", &[])])
            .with_delay(delay);
        let b = MockIndexer::new(2, "beta", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("b-1", "Two", &[])])
            .with_delay(delay);

        let (service, _rx) = service(
            vec![Arc::new(a), Arc::new(b)],
            Arc::new(MockLimiter::unlimited()),
        );

        let started = tokio::time::Instant::now();
        let results = service.search(&request("x"), vec![], false).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(results.releases.len(), 2);
        // Sequential dispatch would take 200ms
        assert!(elapsed >= delay);
        assert!(elapsed < delay * 2, "indexers ran sequentially: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_failing_indexer_does_not_affect_siblings() {
        let ok = MockIndexer::new(1, "healthy", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("a-1", "One", &[])]);
        let broken =
            MockIndexer::new(2, "broken", DownloadProtocol::Torrent).with_error(5, "Too many requests");

        let (service, mut rx) = service(
            vec![Arc::new(ok), Arc::new(broken)],
            Arc::new(MockLimiter::unlimited()),
        );

        let results = service.search(&request("x"), vec![], false).await.unwrap();
        assert_eq!(results.releases.len(), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        let failure = events.iter().find(|e| e.indexer_id == 2).unwrap();
        assert!(!failure.successful());
    }

    #[tokio::test]
    async fn test_panicking_indexer_does_not_affect_siblings() {
        let ok = MockIndexer::new(1, "healthy", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("a-1", "One", &[])]);
        let hostile = MockIndexer::new(2, "hostile", DownloadProtocol::Torrent).with_panic();

        let (service, mut rx) = service(
            vec![Arc::new(ok), Arc::new(hostile)],
            Arc::new(MockLimiter::unlimited()),
        );

        let results = service.search(&request("x"), vec![], false).await.unwrap();
        assert_eq!(results.releases.len(), 1);

        // The panic is recorded like any other fetch failure
        let events = drain(&mut rx);
        let failure = events.iter().find(|e| e.indexer_id == 2).unwrap();
        assert!(!failure.successful());
        assert_eq!(failure.indexer, "hostile");
    }

    #[tokio::test]
    async fn test_quota_exhausted_indexer_is_skipped_silently() {
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("a-1", "One", &[])]);
        let b = MockIndexer::new(2, "beta", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("b-1", "Two", &[])]);

        let (service, mut rx) = service(
            vec![Arc::new(a), Arc::new(b)],
            Arc::new(MockLimiter::limiting([2])),
        );

        let results = service.search(&request("x"), vec![], false).await.unwrap();
        assert_eq!(results.releases.len(), 1);
        assert_eq!(results.releases[0].guid, "a-1");

        // The skip leaves no trace in the history
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].indexer_id, 1);
    }

    #[tokio::test]
    async fn test_explicit_indexer_ids_select_a_subset() {
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("a-1", "One", &[])]);
        let b = MockIndexer::new(2, "beta", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("b-1", "Two", &[])]);

        let (service, _rx) = service(
            vec![Arc::new(a), Arc::new(b)],
            Arc::new(MockLimiter::unlimited()),
        );

        let results = service.search(&request("x"), vec![2], false).await.unwrap();
        assert_eq!(results.releases.len(), 1);
        assert_eq!(results.releases[0].guid, "b-1");
    }

    #[tokio::test]
    async fn test_protocol_sentinels_expand_by_protocol() {
        let torrent = MockIndexer::new(1, "torrent", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("t-1", "One", &[])]);
        let usenet = MockIndexer::new(2, "usenet", DownloadProtocol::Usenet)
            .with_releases(vec![fixtures::release("u-1", "Two", &[])]);

        let (service, _rx) = service(
            vec![Arc::new(torrent), Arc::new(usenet)],
            Arc::new(MockLimiter::unlimited()),
        );

        let results = service
            .search(&request("x"), vec![ALL_USENET], false)
            .await
            .unwrap();
        assert_eq!(results.releases.len(), 1);
        assert_eq!(results.releases[0].guid, "u-1");

        let results = service
            .search(&request("x"), vec![ALL_TORRENT], false)
            .await
            .unwrap();
        assert_eq!(results.releases.len(), 1);
        assert_eq!(results.releases[0].guid, "t-1");
    }

    #[tokio::test]
    async fn test_sentinel_combines_with_explicit_ids() {
        let torrent = MockIndexer::new(1, "torrent", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("t-1", "One", &[])]);
        let usenet = MockIndexer::new(2, "usenet", DownloadProtocol::Usenet)
            .with_releases(vec![fixtures::release("u-1", "Two", &[])]);

        let (service, _rx) = service(
            vec![Arc::new(torrent), Arc::new(usenet)],
            Arc::new(MockLimiter::unlimited()),
        );

        let results = service
            .search(&request("x"), vec![ALL_USENET, 1], false)
            .await
            .unwrap();
        assert_eq!(results.releases.len(), 2);
    }

    #[tokio::test]
    async fn test_category_filter_keeps_untagged_releases() {
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Torrent).with_releases(vec![
            fixtures::release("a-1", "Tagged HD", &[5040]),
            fixtures::release("a-2", "Tagged other", &[8000]),
            fixtures::release("a-3", "Untagged", &[]),
        ]);

        let (service, _rx) = service(vec![Arc::new(a)], Arc::new(MockLimiter::unlimited()));

        let mut req = request("x");
        req.cat = Some("5040".to_string());
        let results = service.search(&req, vec![], false).await.unwrap();

        let guids: Vec<_> = results.releases.iter().map(|r| r.guid.as_str()).collect();
        assert_eq!(guids, vec!["a-1", "a-3"]);
    }

    #[tokio::test]
    async fn test_category_filter_expands_parent_groups() {
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Torrent).with_releases(vec![
            fixtures::release("a-1", "TV HD", &[5040]),
            fixtures::release("a-2", "Movie", &[2000]),
        ]);

        let (service, _rx) = service(vec![Arc::new(a)], Arc::new(MockLimiter::unlimited()));

        // Requesting the TV group keeps the declared TV subcategory
        let mut req = request("x");
        req.cat = Some("5000".to_string());
        let results = service.search(&req, vec![], false).await.unwrap();
        assert_eq!(results.releases.len(), 1);
        assert_eq!(results.releases[0].guid, "a-1");
    }

    #[tokio::test]
    async fn test_invalid_category_rejects_the_request() {
        let (service, _rx) = service(vec![], Arc::new(MockLimiter::unlimited()));

        let mut req = request("x");
        req.cat = Some("2000,abc".to_string());
        let err = service.search(&req, vec![], false).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidCategory(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_records_failures() {
        let slow = MockIndexer::new(1, "slow", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("s-1", "One", &[])])
            .with_delay(Duration::from_secs(60));

        let (service, mut rx) = service(vec![Arc::new(slow)], Arc::new(MockLimiter::unlimited()));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = service
            .search_with_cancel(&request("x"), vec![], false, cancel)
            .await
            .unwrap();
        assert!(results.releases.is_empty());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(!events[0].successful());
    }

    #[tokio::test]
    async fn test_per_sub_query_events() {
        // An internally paginating indexer reports one telemetry record
        // per page, and the history gets one event per record.
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Usenet)
            .with_releases(vec![fixtures::release("a-1", "One", &[])])
            .with_pages(3);

        let (service, mut rx) = service(vec![Arc::new(a)], Arc::new(MockLimiter::unlimited()));

        service.search(&request("x"), vec![], false).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.successful()));
    }

    #[tokio::test]
    async fn test_stalled_history_writer_does_not_block_dispatch() {
        // Three sub-queries against a channel with room for one event:
        // the overflow is dropped, the search itself must still finish.
        let a = MockIndexer::new(1, "alpha", DownloadProtocol::Usenet)
            .with_releases(vec![fixtures::release("a-1", "One", &[])])
            .with_pages(3);

        let (tx, mut rx) = mpsc::channel(1);
        let registry = Arc::new(StaticRegistry::new(vec![Arc::new(a) as Arc<dyn Indexer>]));
        let service = SearchService::new(
            registry,
            Arc::new(MockLimiter::unlimited()),
            QueryEventHandle::new(tx),
        );

        // The receiver stays alive but is never drained
        let results = tokio::time::timeout(
            Duration::from_secs(2),
            service.search(&request("x"), vec![], false),
        )
        .await
        .expect("search must not wait on history capacity")
        .unwrap();
        assert_eq!(results.releases.len(), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_mixed_outcome_scenario() {
        // One healthy indexer, one over quota, one failing hard.
        let healthy = MockIndexer::new(1, "healthy", DownloadProtocol::Torrent).with_releases(vec![
            fixtures::release("h-1", "Movie A", &[2000]),
            fixtures::release("h-2", "Movie B", &[2040]),
        ]);
        let throttled = MockIndexer::new(2, "throttled", DownloadProtocol::Torrent)
            .with_releases(vec![fixtures::release("t-1", "Movie C", &[2000])]);
        let broken =
            MockIndexer::new(3, "broken", DownloadProtocol::Usenet).with_error(100, "Invalid API key");

        let (service, mut rx) = service(
            vec![Arc::new(healthy), Arc::new(throttled), Arc::new(broken)],
            Arc::new(MockLimiter::limiting([2])),
        );

        let mut req = request("movie");
        req.cat = Some("2000".to_string());
        let results = service.search(&req, vec![], true).await.unwrap();

        let mut guids: Vec<_> = results.releases.iter().map(|r| r.guid.as_str()).collect();
        guids.sort();
        assert_eq!(guids, vec!["h-1", "h-2"]);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        let healthy_event = events.iter().find(|e| e.indexer_id == 1).unwrap();
        assert!(healthy_event.successful());
        assert!(healthy_event.criteria.interactive);
        let broken_event = events.iter().find(|e| e.indexer_id == 3).unwrap();
        assert!(!broken_event.successful());
        assert!(!events.iter().any(|e| e.indexer_id == 2));
    }

    #[test]
    fn test_build_criteria_maps_search_types() {
        let mut req = request("dune");
        req.t = Some("movie".to_string());
        req.imdbid = Some("tt1160419".to_string());
        req.year = Some(2021);

        let criteria = build_criteria(&req, vec![1], true).unwrap();
        assert_eq!(criteria.search_type(), "movie");
        assert!(criteria.interactive);
        assert_eq!(criteria.indexer_ids, vec![1]);
        match criteria.kind {
            SearchKind::Movie { imdb_id, year, .. } => {
                assert_eq!(imdb_id.as_deref(), Some("tt1160419"));
                assert_eq!(year, Some(2021));
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let mut req = request("lost");
        req.t = Some("tv".to_string());
        let criteria = build_criteria(&req, vec![], false).unwrap();
        assert_eq!(criteria.search_type(), "tvsearch");
    }

    #[test]
    fn test_build_criteria_unknown_type_falls_back_to_basic() {
        let mut req = request("dune");
        req.t = Some("caps".to_string());
        let criteria = build_criteria(&req, vec![], false).unwrap();
        assert_eq!(criteria.search_type(), "search");
    }
}
