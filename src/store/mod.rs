//! Cache storage abstraction for metaharvest.
//!
//! The [`CacheStore`] trait defines the persistence operations the
//! resolver and orchestrator need, with two backends: an embedded
//! SQLite file for the common single-process case and Postgres for
//! multi-process deployments with trigram fuzzy search.
//!
//! The two backends are deliberately **not** numerically equivalent for
//! fuzzy search: Postgres uses `pg_trgm` `similarity()` against a
//! configurable threshold, while SQLite falls back to a case-insensitive
//! substring match with no threshold at all. That asymmetry is an
//! accepted platform inconsistency.

pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ActorInfo, MovieInfo};

/// Hard server-side cap on search result rows, regardless of the
/// caller-requested limit.
pub const MAX_SEARCH_LIMIT: i64 = 20;

/// Options for a cache search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Restrict matches to a single provider.
    pub provider: Option<String>,
    /// Trigram similarity threshold (postgres backend only).
    pub threshold: f64,
    /// Requested row limit; clamped to [`MAX_SEARCH_LIMIT`].
    pub limit: i64,
    /// Row offset for paging.
    pub offset: i64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            provider: None,
            threshold: 0.2,
            limit: MAX_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

impl SearchQuery {
    /// The limit actually applied, after clamping.
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_SEARCH_LIMIT)
    }
}

/// Durable, queryable storage for metadata records.
///
/// All reads match `(provider, id)` case-insensitively. Writes are
/// validity-gated upserts: an invalid record is rejected with
/// [`IncompleteMetadata`](crate::Error::IncompleteMetadata) and never
/// touches the database, and a conflicting primary key overwrites every
/// column (no partial-field merge). Implementations must support
/// concurrent use from multiple tasks.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`migrate`](CacheStore::migrate) | Idempotent schema bootstrap |
/// | [`get_actor`](CacheStore::get_actor) / [`get_movie`](CacheStore::get_movie) | Exact case-insensitive lookup |
/// | [`put_actor`](CacheStore::put_actor) / [`put_movie`](CacheStore::put_movie) | Validity-gated wholesale upsert |
/// | [`search_actors`](CacheStore::search_actors) / [`search_movies`](CacheStore::search_movies) | Exact-or-fuzzy search |
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create tables and indexes if absent. Safe to call on every start.
    async fn migrate(&self) -> Result<()>;

    /// Exact case-insensitive lookup of an actor record.
    async fn get_actor(&self, provider: &str, id: &str) -> Result<Option<ActorInfo>>;

    /// Exact case-insensitive lookup of a movie record.
    async fn get_movie(&self, provider: &str, id: &str) -> Result<Option<MovieInfo>>;

    /// Insert or wholesale-overwrite an actor record.
    async fn put_actor(&self, info: &ActorInfo) -> Result<()>;

    /// Insert or wholesale-overwrite a movie record.
    async fn put_movie(&self, info: &MovieInfo) -> Result<()>;

    /// Exact or fuzzy search on actor name.
    async fn search_actors(&self, keyword: &str, query: &SearchQuery) -> Result<Vec<ActorInfo>>;

    /// Exact or fuzzy search on movie number.
    async fn search_movies(&self, keyword: &str, query: &SearchQuery) -> Result<Vec<MovieInfo>>;
}

/// The upsert validity gate shared by both backends.
pub(crate) fn reject_invalid(valid: bool, provider: &str, id: &str) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(Error::IncompleteMetadata(format!(
            "record {provider}:{id} is missing required fields"
        )))
    }
}

/// Decode a stored JSON payload, skipping corrupt rows with a warning.
///
/// A corrupt cache row must degrade to a miss, never to a hard failure.
/// Shared by both backends so the degradation is logged the same way.
pub(crate) fn decode_row<T: serde::de::DeserializeOwned>(
    data: &str,
    context: &str,
    key: &str,
) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(context, key, error = %err, "skipping corrupt cache row");
            None
        }
    }
}
