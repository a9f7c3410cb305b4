//! Lazy get-or-fetch-and-store resolution of a single identified entity.
//!
//! With `lazy` set, a valid cached record short-circuits the network
//! entirely. Otherwise the provider is fetched, the record validated,
//! and the cache updated best-effort: a cache write failure is logged
//! and swallowed, never turning a successful fetch into a caller-visible
//! error.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{ActorInfo, MovieInfo};
use crate::registry::ProviderRegistry;
use crate::store::CacheStore;

/// Resolves `(provider, id)` pairs to full, validated records.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn CacheStore>,
    registry: Arc<ProviderRegistry>,
}

impl Resolver {
    pub fn new(store: Arc<dyn CacheStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    /// Resolve a movie by provider name and id.
    pub async fn movie(&self, provider_name: &str, id: &str, lazy: bool) -> Result<MovieInfo> {
        let entry = self.registry.movie(provider_name)?;
        let provider = Arc::clone(&entry.provider);

        let id = provider.normalize_id(id);
        if id.is_empty() {
            return Err(Error::InvalidId(format!("{provider_name}: empty id")));
        }

        if lazy {
            match self.store.get_movie(provider_name, &id).await {
                Ok(Some(cached)) if cached.is_valid() => {
                    tracing::debug!(provider = provider_name, id, "movie cache hit");
                    return Ok(cached);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(provider = provider_name, id, error = %err,
                        "movie cache read failed, fetching live");
                }
            }
        }

        let info = provider.fetch_by_id(&id).await?;
        self.finish_movie(info).await
    }

    /// Resolve a movie through one of its provider's URLs.
    pub async fn movie_by_url(&self, provider_name: &str, url: &str, lazy: bool) -> Result<MovieInfo> {
        let entry = self.registry.movie(provider_name)?;
        let provider = Arc::clone(&entry.provider);

        let id = provider.parse_id_from_url(url)?;

        if lazy {
            if let Ok(Some(cached)) = self.store.get_movie(provider_name, &id).await {
                if cached.is_valid() {
                    return Ok(cached);
                }
            }
        }

        let info = provider.fetch_by_url(url).await?;
        self.finish_movie(info).await
    }

    /// Resolve an actor by provider name and id.
    pub async fn actor(&self, provider_name: &str, id: &str, lazy: bool) -> Result<ActorInfo> {
        let entry = self.registry.actor(provider_name)?;
        let provider = Arc::clone(&entry.provider);

        let id = provider.normalize_id(id);
        if id.is_empty() {
            return Err(Error::InvalidId(format!("{provider_name}: empty id")));
        }

        if lazy {
            match self.store.get_actor(provider_name, &id).await {
                Ok(Some(cached)) if cached.is_valid() => {
                    tracing::debug!(provider = provider_name, id, "actor cache hit");
                    return Ok(cached);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(provider = provider_name, id, error = %err,
                        "actor cache read failed, fetching live");
                }
            }
        }

        let info = provider.fetch_by_id(&id).await?;
        self.finish_actor(info).await
    }

    /// Resolve an actor through one of its provider's URLs.
    pub async fn actor_by_url(&self, provider_name: &str, url: &str, lazy: bool) -> Result<ActorInfo> {
        let entry = self.registry.actor(provider_name)?;
        let provider = Arc::clone(&entry.provider);

        let id = provider.parse_id_from_url(url)?;

        if lazy {
            if let Ok(Some(cached)) = self.store.get_actor(provider_name, &id).await {
                if cached.is_valid() {
                    return Ok(cached);
                }
            }
        }

        let info = provider.fetch_by_url(url).await?;
        self.finish_actor(info).await
    }

    /// Validate then best-effort store a freshly fetched movie.
    async fn finish_movie(&self, info: MovieInfo) -> Result<MovieInfo> {
        if !info.is_valid() {
            return Err(Error::IncompleteMetadata(format!(
                "movie {}:{} from live fetch",
                info.provider, info.id
            )));
        }

        if let Err(err) = self.store.put_movie(&info).await {
            tracing::warn!(provider = %info.provider, id = %info.id, error = %err,
                "movie cache write failed, returning live record");
        }

        Ok(info)
    }

    /// Validate then best-effort store a freshly fetched actor.
    async fn finish_actor(&self, info: ActorInfo) -> Result<ActorInfo> {
        if !info.is_valid() {
            return Err(Error::IncompleteMetadata(format!(
                "actor {}:{} from live fetch",
                info.provider, info.id
            )));
        }

        if let Err(err) = self.store.put_actor(&info).await {
            tracing::warn!(provider = %info.provider, id = %info.id, error = %err,
                "actor cache write failed, returning live record");
        }

        Ok(info)
    }
}
