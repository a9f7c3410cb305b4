//! End-to-end tests against an in-memory SQLite store and stub providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use metaharvest::aggregate::Aggregator;
use metaharvest::config::SearchTuning;
use metaharvest::error::{Error, Result};
use metaharvest::models::{ActorInfo, ActorSearchResult, MovieInfo};
use metaharvest::provider::{ActorProvider, ActorSearcher, ProviderIdentity};
use metaharvest::registry::ProviderRegistry;
use metaharvest::resolver::Resolver;
use metaharvest::store::sqlite::SqliteStore;
use metaharvest::store::{CacheStore, SearchQuery, MAX_SEARCH_LIMIT};

fn identity(name: &str) -> ProviderIdentity {
    ProviderIdentity {
        name: name.into(),
        base_url: format!("https://{}.example", name.to_lowercase()),
        language: "ja".into(),
    }
}

fn actor_info(provider: &str, id: &str, name: &str) -> ActorInfo {
    ActorInfo {
        provider: provider.into(),
        id: id.into(),
        name: name.into(),
        aliases: Vec::new(),
        images: Vec::new(),
        birthday: None,
        nationality: None,
        height: None,
        homepage: None,
        updated_at: Utc::now(),
    }
}

fn movie_info(provider: &str, id: &str, number: &str, title: &str) -> MovieInfo {
    MovieInfo {
        provider: provider.into(),
        id: id.into(),
        number: number.into(),
        title: title.into(),
        summary: String::new(),
        cover: String::new(),
        thumb: String::new(),
        actors: Vec::new(),
        genres: Vec::new(),
        series: None,
        release_date: None,
        runtime_minutes: None,
        score: None,
        homepage: None,
        updated_at: Utc::now(),
    }
}

fn actor_result(provider: &str, id: &str, name: &str) -> ActorSearchResult {
    ActorSearchResult {
        provider: provider.into(),
        id: id.into(),
        name: name.into(),
        images: Vec::new(),
    }
}

async fn fresh_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.migrate().await.unwrap();
    Arc::new(store)
}

/// Serves a fixed record by id and counts every live fetch.
struct CountingProvider {
    identity: ProviderIdentity,
    record: ActorInfo,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl ActorProvider for CountingProvider {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    fn parse_id_from_url(&self, url: &str) -> Result<String> {
        url.rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::InvalidUrl(url.to_string()))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<ActorInfo> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if id == self.record.id {
            Ok(self.record.clone())
        } else {
            Err(Error::InfoNotFound)
        }
    }

    async fn fetch_by_url(&self, url: &str) -> Result<ActorInfo> {
        let id = self.parse_id_from_url(url)?;
        self.fetch_by_id(&id).await
    }
}

/// Provider with a keyword-search capability over fixed results.
struct SearchingProvider {
    identity: ProviderIdentity,
    results: Vec<ActorSearchResult>,
}

#[async_trait]
impl ActorProvider for SearchingProvider {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    fn parse_id_from_url(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    async fn fetch_by_id(&self, _id: &str) -> Result<ActorInfo> {
        Err(Error::InfoNotFound)
    }

    async fn fetch_by_url(&self, _url: &str) -> Result<ActorInfo> {
        Err(Error::InfoNotFound)
    }

    fn searcher(&self) -> Option<&dyn ActorSearcher> {
        Some(self)
    }
}

#[async_trait]
impl ActorSearcher for SearchingProvider {
    async fn search(&self, _keyword: &str) -> Result<Vec<ActorSearchResult>> {
        Ok(self.results.clone())
    }
}

/// Searcher that always fails, with or without a record-not-found kind.
struct FailingProvider {
    identity: ProviderIdentity,
    not_found: bool,
}

#[async_trait]
impl ActorProvider for FailingProvider {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    fn parse_id_from_url(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    async fn fetch_by_id(&self, _id: &str) -> Result<ActorInfo> {
        Err(Error::InfoNotFound)
    }

    async fn fetch_by_url(&self, _url: &str) -> Result<ActorInfo> {
        Err(Error::InfoNotFound)
    }

    fn searcher(&self) -> Option<&dyn ActorSearcher> {
        Some(self)
    }
}

#[async_trait]
impl ActorSearcher for FailingProvider {
    async fn search(&self, _keyword: &str) -> Result<Vec<ActorSearchResult>> {
        if self.not_found {
            Err(Error::InfoNotFound)
        } else {
            Err(Error::Timeout("simulated outage".into()))
        }
    }
}

/// Searcher that never reports back.
struct StalledProvider {
    identity: ProviderIdentity,
}

#[async_trait]
impl ActorProvider for StalledProvider {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    fn parse_id_from_url(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    async fn fetch_by_id(&self, _id: &str) -> Result<ActorInfo> {
        Err(Error::InfoNotFound)
    }

    async fn fetch_by_url(&self, _url: &str) -> Result<ActorInfo> {
        Err(Error::InfoNotFound)
    }

    fn searcher(&self) -> Option<&dyn ActorSearcher> {
        Some(self)
    }
}

#[async_trait]
impl ActorSearcher for StalledProvider {
    async fn search(&self, _keyword: &str) -> Result<Vec<ActorSearchResult>> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[tokio::test]
async fn lazy_resolve_skips_fetch_on_valid_cache_hit() {
    let store = fresh_store().await;
    store
        .put_actor(&actor_info("X", "24490", "Jane"))
        .await
        .unwrap();

    let fetches = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(CountingProvider {
            identity: identity("X"),
            record: actor_info("X", "24490", "Jane"),
            fetches: Arc::clone(&fetches),
        }),
        1.0,
    );

    let resolver = Resolver::new(store, Arc::new(registry));
    let info = resolver.actor("X", "24490", true).await.unwrap();

    assert_eq!(info.name, "Jane");
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_lazy_resolve_fetches_and_populates_cache() {
    let store = fresh_store().await;
    let fetches = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(CountingProvider {
            identity: identity("X"),
            record: actor_info("X", "24490", "Jane"),
            fetches: Arc::clone(&fetches),
        }),
        1.0,
    );

    let resolver = Resolver::new(Arc::clone(&store) as Arc<dyn CacheStore>, Arc::new(registry));
    let info = resolver.actor("X", "24490", false).await.unwrap();
    assert_eq!(info.name, "Jane");
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let cached = store.get_actor("X", "24490").await.unwrap().unwrap();
    assert_eq!(cached.name, "Jane");

    // A second lazy resolve is served from the cache.
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(CountingProvider {
            identity: identity("X"),
            record: actor_info("X", "24490", "Jane"),
            fetches: Arc::clone(&fetches),
        }),
        1.0,
    );
    let resolver = Resolver::new(store, Arc::new(registry));
    resolver.actor("X", "24490", true).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn incomplete_fetched_record_is_rejected_and_never_cached() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(CountingProvider {
            identity: identity("X"),
            // Missing name, so it must fail validation after the fetch.
            record: actor_info("X", "24490", ""),
            fetches: Arc::new(AtomicUsize::new(0)),
        }),
        1.0,
    );

    let resolver = Resolver::new(Arc::clone(&store) as Arc<dyn CacheStore>, Arc::new(registry));
    let err = resolver.actor("X", "24490", false).await.unwrap_err();
    assert!(matches!(err, Error::IncompleteMetadata(_)));
    assert_eq!(err.status_code(), 500);

    assert!(store.get_actor("X", "24490").await.unwrap().is_none());
}

#[tokio::test]
async fn search_all_tolerates_partial_provider_failure() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("OK"),
            results: vec![actor_result("OK", "1", "Jane")],
        }),
        2.0,
    );
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("EMPTY"),
            not_found: true,
        }),
        1.0,
    );
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("DOWN"),
            not_found: false,
        }),
        1.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let results = aggregator.search_actors_all("Jane", false, None).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider, "OK");
}

#[tokio::test]
async fn search_all_fails_only_when_every_provider_fails() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("A"),
            not_found: false,
        }),
        1.0,
    );
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("B"),
            not_found: false,
        }),
        1.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let err = aggregator
        .search_actors_all("Jane", false, None)
        .await
        .unwrap_err();

    match err {
        Error::AllProvidersFailed(joined) => {
            assert!(joined.contains("A:"));
            assert!(joined.contains("B:"));
        }
        other => panic!("expected AllProvidersFailed, got {other}"),
    }
}

#[tokio::test]
async fn not_found_everywhere_yields_empty_results_not_an_error() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("A"),
            not_found: true,
        }),
        1.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let results = aggregator.search_actors_all("Jane", false, None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn fallback_merges_cache_then_live_deduplicated() {
    let store = fresh_store().await;
    store
        .put_actor(&actor_info("X", "2", "Jane B"))
        .await
        .unwrap();

    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("X"),
            results: vec![actor_result("X", "1", "Jane")],
        }),
        100.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let results = aggregator
        .search_actors_one("Jane", "X", true)
        .await
        .unwrap();

    // Distinct ids stay distinct; the cached record holds its earlier slot.
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "2");
    assert_eq!(results[0].name, "Jane B");
    assert_eq!(results[1].id, "1");
    assert_eq!(results[1].name, "Jane");
}

#[tokio::test]
async fn fallback_overwrites_cached_content_on_key_collision() {
    let store = fresh_store().await;
    store
        .put_actor(&actor_info("X", "1", "Jane Stale"))
        .await
        .unwrap();

    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("X"),
            results: vec![actor_result("X", "1", "Jane")],
        }),
        1.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let results = aggregator
        .search_actors_one("Jane", "X", true)
        .await
        .unwrap();

    // Same key: one entry, live content wins.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Jane");
}

#[tokio::test]
async fn disabled_provider_is_invisible_to_single_provider_search() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("OFF"),
            results: vec![actor_result("OFF", "1", "Jane")],
        }),
        0.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let err = aggregator
        .search_actors_one("Jane", "OFF", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProviderNotFound(_)));
}

#[tokio::test]
async fn disabled_provider_is_invisible_to_resolver() {
    let store = fresh_store().await;
    let fetches = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(CountingProvider {
            identity: identity("OFF"),
            record: actor_info("OFF", "24490", "Jane"),
            fetches: Arc::clone(&fetches),
        }),
        0.0,
    );

    let resolver = Resolver::new(store, Arc::new(registry));
    let err = resolver.actor("OFF", "24490", false).await.unwrap_err();
    assert!(matches!(err, Error::ProviderNotFound(_)));
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fallback_serves_cache_when_live_search_fails() {
    let store = fresh_store().await;
    store
        .put_actor(&actor_info("DOWN", "2", "Jane B"))
        .await
        .unwrap();

    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("DOWN"),
            not_found: false,
        }),
        1.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());

    // With fallback the cached record still answers the outage.
    let results = aggregator
        .search_actors_one("Jane", "DOWN", true)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Jane B");

    // Without fallback the outage surfaces as-is.
    let err = aggregator
        .search_actors_one("Jane", "DOWN", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn fallback_propagates_live_failure_when_cache_is_empty() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(FailingProvider {
            identity: identity("DOWN"),
            not_found: false,
        }),
        1.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let err = aggregator
        .search_actors_one("Jane", "DOWN", true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn open_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("cache.db");

    let store = SqliteStore::open(&path).await.unwrap();
    store.migrate().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn cache_only_search_works_with_no_providers() {
    let store = fresh_store().await;
    store
        .put_actor(&actor_info("GONE", "1", "Jane"))
        .await
        .unwrap();

    let aggregator = Aggregator::new(store, Arc::new(ProviderRegistry::new()), SearchTuning::default());

    // Without fallback there is nothing to ask.
    let err = aggregator
        .search_actors_all("Jane", false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProviderNotFound(_)));

    // With fallback the cache still answers, even for an unregistered provider.
    let results = aggregator.search_actors_all("Jane", true, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider, "GONE");
}

#[tokio::test]
async fn deadline_abandons_stalled_provider() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(StalledProvider {
            identity: identity("SLOW"),
        }),
        1.0,
    );
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("FAST"),
            results: vec![actor_result("FAST", "1", "Jane")],
        }),
        2.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let results = aggregator
        .search_actors_all("Jane", false, Some(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider, "FAST");
}

#[tokio::test]
async fn higher_priority_provider_ranks_first() {
    let store = fresh_store().await;
    let mut registry = ProviderRegistry::new();
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("LOW"),
            results: vec![actor_result("LOW", "1", "Jane")],
        }),
        1.0,
    );
    registry.register_actor(
        Arc::new(SearchingProvider {
            identity: identity("HIGH"),
            results: vec![actor_result("HIGH", "1", "Jane")],
        }),
        4.0,
    );

    let aggregator = Aggregator::new(store, Arc::new(registry), SearchTuning::default());
    let results = aggregator.search_actors_all("Jane", false, None).await.unwrap();

    let providers: Vec<_> = results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(providers, vec!["HIGH", "LOW"]);
}

#[tokio::test]
async fn store_search_clamps_oversized_limit() {
    let store = fresh_store().await;
    for i in 0..30 {
        store
            .put_movie(&movie_info("X", &format!("{i}"), &format!("MDX-{i:04}"), "Title"))
            .await
            .unwrap();
    }

    let query = SearchQuery {
        limit: 1000,
        ..Default::default()
    };
    let results = store.search_movies("MDX", &query).await.unwrap();
    assert_eq!(results.len() as i64, MAX_SEARCH_LIMIT);
}

#[tokio::test]
async fn store_lookup_is_case_insensitive() {
    let store = fresh_store().await;
    store
        .put_movie(&movie_info("FANZA", "Mdx0109", "MDX-0109", "Title"))
        .await
        .unwrap();

    let hit = store.get_movie("fanza", "MDX0109").await.unwrap();
    assert!(hit.is_some());
}

#[tokio::test]
async fn store_upsert_overwrites_wholesale() {
    let store = fresh_store().await;
    let mut info = movie_info("FANZA", "mdx0109", "MDX-0109", "Old title");
    info.genres = vec!["Drama".into()];
    store.put_movie(&info).await.unwrap();

    // Second write carries no genres; the row must not keep the old ones.
    store
        .put_movie(&movie_info("FANZA", "mdx0109", "MDX-0109", "New title"))
        .await
        .unwrap();

    let cached = store.get_movie("FANZA", "mdx0109").await.unwrap().unwrap();
    assert_eq!(cached.title, "New title");
    assert!(cached.genres.is_empty());
}

#[tokio::test]
async fn store_rejects_invalid_record() {
    let store = fresh_store().await;
    let err = store
        .put_movie(&movie_info("FANZA", "mdx0109", "", "Title"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IncompleteMetadata(_)));
}
