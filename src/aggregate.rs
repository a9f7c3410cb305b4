//! Search orchestration: concurrent provider fan-out, merge, dedup, rank.
//!
//! `search_*_one` queries a single provider with an optional cache
//! fallback merge; `search_*_all` fans the keyword out to every enabled
//! provider as an independent tokio task. Each task sends its complete
//! result batch once over a channel to a single collector indexed by
//! dispatch order, so task completion order can never leak into the
//! caller-visible ordering. Per-provider failures are recovered locally;
//! the aggregate call fails only when every attempted provider failed.
//!
//! Merge ordering policy: on a fallback merge, cache results are added to
//! the dedup set first and live results second. With the set's
//! overwrite-in-place semantics this means live *content* wins on a key
//! collision while cache-established positions define the base order;
//! purely-live records append after.
//!
//! Failure policy for a fallback single-provider search: a live failure is
//! recovered when the cache query returned records, and propagated when it
//! did not, so a provider outage degrades to cache-only instead of an
//! error as long as the cache can answer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::SearchTuning;
use crate::dedup::OrderedSet;
use crate::error::{Error, Result};
use crate::models::{ActorSearchResult, MovieSearchResult};
use crate::rank::WeightedList;
use crate::registry::{ProviderRegistry, Registered};
use crate::resolver::Resolver;
use crate::similarity;
use crate::store::{CacheStore, SearchQuery};

/// The search orchestrator.
pub struct Aggregator {
    store: Arc<dyn CacheStore>,
    registry: Arc<ProviderRegistry>,
    tuning: SearchTuning,
    resolver: Resolver,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        registry: Arc<ProviderRegistry>,
        tuning: SearchTuning,
    ) -> Self {
        let resolver = Resolver::new(Arc::clone(&store), Arc::clone(&registry));
        Self {
            store,
            registry,
            tuning,
            resolver,
        }
    }

    /// Search one movie provider, optionally merging cached records.
    pub async fn search_movies_one(
        &self,
        keyword: &str,
        provider_name: &str,
        fallback: bool,
    ) -> Result<Vec<MovieSearchResult>> {
        let keyword = require_keyword(keyword)?;
        let entry = self.registry.movie(provider_name)?;

        let live = movie_live_search(
            entry.clone(),
            &self.resolver,
            keyword,
            self.tuning.filter_threshold,
        )
        .await;

        if !fallback {
            return live;
        }

        let query = SearchQuery {
            provider: Some(provider_name.to_string()),
            threshold: self.tuning.movie_threshold,
            ..Default::default()
        };
        let cached = match self.store.search_movies(keyword, &query).await {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(provider = provider_name, error = %err,
                    "movie cache fallback query failed");
                Vec::new()
            }
        };

        // A live failure is recovered when the cache can still answer;
        // it surfaces only when the cache has nothing for this keyword.
        let live = match live {
            Ok(live) => live,
            Err(err) if !cached.is_empty() => {
                tracing::warn!(provider = provider_name, error = %err,
                    "movie live search failed, serving cached results");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let mut set = OrderedSet::new(|r: &MovieSearchResult| r.key());
        set.extend(cached.iter().map(MovieSearchResult::from));
        set.extend(live);

        Ok(set.into_vec())
    }

    /// Search one actor provider, optionally merging cached records.
    pub async fn search_actors_one(
        &self,
        keyword: &str,
        provider_name: &str,
        fallback: bool,
    ) -> Result<Vec<ActorSearchResult>> {
        let keyword = require_keyword(keyword)?;
        let entry = self.registry.actor(provider_name)?;

        let live = actor_live_search(
            entry.clone(),
            &self.resolver,
            keyword,
            self.tuning.filter_threshold,
        )
        .await;

        if !fallback {
            return live;
        }

        let query = SearchQuery {
            provider: Some(provider_name.to_string()),
            threshold: self.tuning.actor_threshold,
            ..Default::default()
        };
        let cached = match self.store.search_actors(keyword, &query).await {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(provider = provider_name, error = %err,
                    "actor cache fallback query failed");
                Vec::new()
            }
        };

        let live = match live {
            Ok(live) => live,
            Err(err) if !cached.is_empty() => {
                tracing::warn!(provider = provider_name, error = %err,
                    "actor live search failed, serving cached results");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let mut set = OrderedSet::new(|r: &ActorSearchResult| r.key());
        set.extend(cached.iter().map(ActorSearchResult::from));
        set.extend(live);

        Ok(set.into_vec())
    }

    /// Search every enabled movie provider concurrently.
    ///
    /// Results are deduplicated (when `fallback` adds a cache pass),
    /// then ranked: a stable sort by provider priority, refined for this
    /// keyword-driven variant by `similarity(keyword, number) * priority`.
    pub async fn search_movies_all(
        &self,
        keyword: &str,
        fallback: bool,
        deadline: Option<Duration>,
    ) -> Result<Vec<MovieSearchResult>> {
        let keyword = require_keyword(keyword)?;
        let entries = self.registry.enabled_movies();

        if entries.is_empty() {
            if fallback {
                return self.cache_only_movies(keyword).await;
            }
            return Err(Error::ProviderNotFound(
                "no enabled movie providers".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let tx = tx.clone();
            let entry = entry.clone();
            let resolver = self.resolver.clone();
            let keyword = keyword.to_string();
            let threshold = self.tuning.filter_threshold;
            tokio::spawn(async move {
                let outcome =
                    movie_live_search(entry, &resolver, &keyword, threshold).await;
                // The collector may have given up on a deadline.
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        let batches = collect_batches(rx, entries.len(), deadline).await;

        let mut collected: Vec<(f64, MovieSearchResult)> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        for (entry, outcome) in entries.iter().zip(batches) {
            let name = &entry.provider.identity().name;
            match outcome {
                Ok(results) => {
                    tracing::debug!(provider = %name, count = results.len(),
                        "movie provider returned results");
                    collected.extend(results.into_iter().map(|r| (entry.priority, r)));
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(provider = %name, "movie provider had no match");
                }
                Err(err) => {
                    tracing::warn!(provider = %name, error = %err,
                        "movie provider search failed");
                    errors.push(format!("{name}: {err}"));
                }
            }
        }

        if collected.is_empty() && !errors.is_empty() {
            return Err(Error::AllProvidersFailed(errors.join("; ")));
        }

        let merged = if fallback {
            let mut set = OrderedSet::new(|pair: &(f64, MovieSearchResult)| pair.1.key());
            let query = SearchQuery {
                threshold: self.tuning.movie_threshold,
                ..Default::default()
            };
            match self.store.search_movies(keyword, &query).await {
                Ok(cached) => set.extend(
                    cached
                        .iter()
                        .map(|info| (self.movie_priority_of(&info.provider), info.into())),
                ),
                Err(err) => {
                    tracing::warn!(error = %err, "global movie cache fallback failed");
                }
            }
            set.extend(collected);
            set.into_vec()
        } else {
            collected
        };

        Ok(rank_movies(keyword, merged))
    }

    /// Search every enabled actor provider concurrently.
    ///
    /// Final ordering is a stable sort by provider priority descending.
    pub async fn search_actors_all(
        &self,
        keyword: &str,
        fallback: bool,
        deadline: Option<Duration>,
    ) -> Result<Vec<ActorSearchResult>> {
        let keyword = require_keyword(keyword)?;
        let entries = self.registry.enabled_actors();

        if entries.is_empty() {
            if fallback {
                return self.cache_only_actors(keyword).await;
            }
            return Err(Error::ProviderNotFound(
                "no enabled actor providers".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let tx = tx.clone();
            let entry = entry.clone();
            let resolver = self.resolver.clone();
            let keyword = keyword.to_string();
            let threshold = self.tuning.filter_threshold;
            tokio::spawn(async move {
                let outcome =
                    actor_live_search(entry, &resolver, &keyword, threshold).await;
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        let batches = collect_batches(rx, entries.len(), deadline).await;

        let mut collected: Vec<(f64, ActorSearchResult)> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        for (entry, outcome) in entries.iter().zip(batches) {
            let name = &entry.provider.identity().name;
            match outcome {
                Ok(results) => {
                    tracing::debug!(provider = %name, count = results.len(),
                        "actor provider returned results");
                    collected.extend(results.into_iter().map(|r| (entry.priority, r)));
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(provider = %name, "actor provider had no match");
                }
                Err(err) => {
                    tracing::warn!(provider = %name, error = %err,
                        "actor provider search failed");
                    errors.push(format!("{name}: {err}"));
                }
            }
        }

        if collected.is_empty() && !errors.is_empty() {
            return Err(Error::AllProvidersFailed(errors.join("; ")));
        }

        let merged = if fallback {
            let mut set = OrderedSet::new(|pair: &(f64, ActorSearchResult)| pair.1.key());
            let query = SearchQuery {
                threshold: self.tuning.actor_threshold,
                ..Default::default()
            };
            match self.store.search_actors(keyword, &query).await {
                Ok(cached) => set.extend(
                    cached
                        .iter()
                        .map(|info| (self.actor_priority_of(&info.provider), info.into())),
                ),
                Err(err) => {
                    tracing::warn!(error = %err, "global actor cache fallback failed");
                }
            }
            set.extend(collected);
            set.into_vec()
        } else {
            collected
        };

        Ok(rank_actors(merged))
    }

    /// Cache-only movie search for when no provider is enabled.
    async fn cache_only_movies(&self, keyword: &str) -> Result<Vec<MovieSearchResult>> {
        let query = SearchQuery {
            threshold: self.tuning.movie_threshold,
            ..Default::default()
        };
        let cached = self.store.search_movies(keyword, &query).await?;
        let pairs = cached
            .iter()
            .map(|info| (self.movie_priority_of(&info.provider), info.into()))
            .collect();
        Ok(rank_movies(keyword, pairs))
    }

    /// Cache-only actor search for when no provider is enabled.
    async fn cache_only_actors(&self, keyword: &str) -> Result<Vec<ActorSearchResult>> {
        let query = SearchQuery {
            threshold: self.tuning.actor_threshold,
            ..Default::default()
        };
        let cached = self.store.search_actors(keyword, &query).await?;
        let pairs = cached
            .iter()
            .map(|info| (self.actor_priority_of(&info.provider), info.into()))
            .collect();
        Ok(rank_actors(pairs))
    }

    /// Priority for a cached record's provider; disabled or unregistered
    /// providers rank at zero, keeping their records at the bottom.
    fn movie_priority_of(&self, provider_name: &str) -> f64 {
        self.registry
            .movie(provider_name)
            .map(|e| e.priority)
            .unwrap_or(0.0)
    }

    fn actor_priority_of(&self, provider_name: &str) -> f64 {
        self.registry
            .actor(provider_name)
            .map(|e| e.priority)
            .unwrap_or(0.0)
    }
}

/// Reject keywords that normalized to nothing.
fn require_keyword(keyword: &str) -> Result<&str> {
    let trimmed = keyword.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidKeyword("empty keyword".to_string()));
    }
    Ok(trimmed)
}

/// Live search against one movie provider.
///
/// A provider without a search capability treats the keyword as a direct
/// id and resolves it lazily into a one-element list. Searcher results
/// are post-filtered by keyword similarity against the release number;
/// the id path is an exact hit and bypasses the filter.
async fn movie_live_search(
    entry: Registered<dyn crate::provider::MovieProvider>,
    resolver: &Resolver,
    keyword: &str,
    filter_threshold: f64,
) -> Result<Vec<MovieSearchResult>> {
    match entry.provider.searcher() {
        Some(searcher) => {
            let results = searcher.search(keyword).await?;
            Ok(results
                .into_iter()
                .filter(|r| similarity::ratio(keyword, &r.number) >= filter_threshold)
                .collect())
        }
        None => {
            let name = entry.provider.identity().name.clone();
            let info = resolver.movie(&name, keyword, true).await?;
            Ok(vec![MovieSearchResult::from(&info)])
        }
    }
}

/// Live search against one actor provider; filter is on the actor name.
async fn actor_live_search(
    entry: Registered<dyn crate::provider::ActorProvider>,
    resolver: &Resolver,
    keyword: &str,
    filter_threshold: f64,
) -> Result<Vec<ActorSearchResult>> {
    match entry.provider.searcher() {
        Some(searcher) => {
            let results = searcher.search(keyword).await?;
            Ok(results
                .into_iter()
                .filter(|r| similarity::ratio(keyword, &r.name) >= filter_threshold)
                .collect())
        }
        None => {
            let name = entry.provider.identity().name.clone();
            let info = resolver.actor(&name, keyword, true).await?;
            Ok(vec![ActorSearchResult::from(&info)])
        }
    }
}

/// Receive one batch per task, slotted by dispatch index.
///
/// With a deadline, tasks that have not reported by then are recorded as
/// failures; their detached tasks are abandoned, never awaited.
async fn collect_batches<T>(
    mut rx: mpsc::Receiver<(usize, Result<Vec<T>>)>,
    count: usize,
    deadline: Option<Duration>,
) -> Vec<Result<Vec<T>>> {
    let mut slots: Vec<Option<Result<Vec<T>>>> = Vec::with_capacity(count);
    slots.resize_with(count, || None);

    let drain = async {
        while let Some((index, outcome)) = rx.recv().await {
            slots[index] = Some(outcome);
        }
    };

    match deadline {
        Some(limit) => {
            let _ = tokio::time::timeout(limit, drain).await;
        }
        None => drain.await,
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(Error::Timeout(
                    "no response before deadline".to_string(),
                ))
            })
        })
        .collect()
}

/// Rank movie results: stable priority sort, refined by
/// `similarity(keyword, number) * priority` among equal priorities.
fn rank_movies(keyword: &str, pairs: Vec<(f64, MovieSearchResult)>) -> Vec<MovieSearchResult> {
    let mut by_weight = WeightedList::new();
    for (priority, result) in pairs {
        let weight = similarity::ratio(keyword, &result.number) * priority;
        by_weight.push(weight, (priority, result));
    }
    by_weight.sort_descending();

    // Second stable pass by priority; equal priorities keep the weight order.
    let mut by_priority = WeightedList::new();
    for (priority, result) in by_weight.into_values() {
        by_priority.push(priority, result);
    }
    by_priority.sort_descending();
    by_priority.into_values()
}

/// Rank actor results by provider priority, stable on ties.
fn rank_actors(pairs: Vec<(f64, ActorSearchResult)>) -> Vec<ActorSearchResult> {
    let mut list = WeightedList::new();
    for (priority, result) in pairs {
        list.push(priority, result);
    }
    list.sort_descending();
    list.into_values()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_result(provider: &str, id: &str, number: &str) -> MovieSearchResult {
        MovieSearchResult {
            provider: provider.into(),
            id: id.into(),
            number: number.into(),
            title: format!("{number} title"),
            cover: String::new(),
            thumb: String::new(),
            actors: Vec::new(),
        }
    }

    #[test]
    fn require_keyword_rejects_blank() {
        assert!(matches!(
            require_keyword("   "),
            Err(Error::InvalidKeyword(_))
        ));
        assert_eq!(require_keyword(" abc ").unwrap(), "abc");
    }

    #[test]
    fn rank_movies_priority_dominates() {
        let pairs = vec![
            (1.0, movie_result("LOW", "1", "MDX-0109")),
            (4.0, movie_result("HIGH", "2", "ZZZ-999")),
        ];
        let ranked = rank_movies("MDX-0109", pairs);
        // Perfect similarity cannot outrank a higher-priority provider.
        assert_eq!(ranked[0].provider, "HIGH");
        assert_eq!(ranked[1].provider, "LOW");
    }

    #[test]
    fn rank_movies_similarity_breaks_priority_ties() {
        let pairs = vec![
            (2.0, movie_result("A", "1", "ZZZ-999")),
            (2.0, movie_result("A", "2", "MDX-0109")),
        ];
        let ranked = rank_movies("MDX-0109", pairs);
        assert_eq!(ranked[0].number, "MDX-0109");
        assert_eq!(ranked[1].number, "ZZZ-999");
    }

    #[test]
    fn rank_movies_stable_on_full_ties() {
        let pairs = vec![
            (2.0, movie_result("A", "1", "MDX-0109")),
            (2.0, movie_result("A", "2", "MDX-0109")),
        ];
        let ranked = rank_movies("MDX-0109", pairs);
        assert_eq!(ranked[0].id, "1");
        assert_eq!(ranked[1].id, "2");
    }

    #[test]
    fn rank_actors_by_priority_descending() {
        let make = |provider: &str, name: &str| ActorSearchResult {
            provider: provider.into(),
            id: "1".into(),
            name: name.into(),
            images: Vec::new(),
        };
        let pairs = vec![
            (1.0, make("LOW", "Jane")),
            (3.0, make("HIGH", "Jane")),
            (1.0, make("LOW2", "Jane")),
        ];
        let ranked = rank_actors(pairs);
        let providers: Vec<_> = ranked.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(providers, vec!["HIGH", "LOW", "LOW2"]);
    }

    #[tokio::test]
    async fn collect_batches_orders_by_dispatch_index() {
        let (tx, rx) = mpsc::channel(3);
        // Send completions out of order.
        tx.send((2usize, Ok(vec!["c"]))).await.unwrap();
        tx.send((0, Ok(vec!["a"]))).await.unwrap();
        tx.send((1, Ok(vec!["b"]))).await.unwrap();
        drop(tx);

        let batches = collect_batches(rx, 3, None).await;
        let flattened: Vec<_> = batches
            .into_iter()
            .map(|b| b.unwrap()[0])
            .collect();
        assert_eq!(flattened, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn collect_batches_marks_missing_slots_after_deadline() {
        let (tx, rx) = mpsc::channel::<(usize, Result<Vec<&str>>)>(2);
        tx.send((0, Ok(vec!["a"]))).await.unwrap();
        // Slot 1 never reports; keep the sender alive so recv would block.
        let batches =
            collect_batches(rx, 2, Some(Duration::from_millis(50))).await;
        assert!(batches[0].is_ok());
        assert!(batches[1].is_err());
        drop(tx);
    }
}
