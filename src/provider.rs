//! Capability traits for metadata provider adapters.
//!
//! Adapters live out of tree; this module defines the interface the
//! orchestration core consumes. A provider always supports id- and
//! URL-based retrieval; keyword search is an optional capability exposed
//! through [`ActorProvider::searcher`] / [`MovieProvider::searcher`]
//! rather than runtime type assertions, so "does this provider support
//! search?" is a plain `Option` check.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProvidersConfig;
use crate::error::Result;
use crate::models::{ActorInfo, ActorSearchResult, MovieInfo, MovieSearchResult};

/// Static identity shared by every provider implementation.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    /// Registry name, e.g. `"FANZA"`. Compared case-sensitively.
    pub name: String,
    /// Base URL of the remote source.
    pub base_url: String,
    /// BCP-47 language tag of the metadata this provider serves.
    pub language: String,
}

/// Shared construction context handed to provider constructors.
///
/// Carries the process-wide HTTP client, built once from the configured
/// request timeout. Providers must not build their own clients.
#[derive(Clone)]
pub struct ProviderContext {
    pub client: reqwest::Client,
    pub timeout: Duration,
}

impl ProviderContext {
    /// Build the shared context from config.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

/// An actor metadata provider.
#[async_trait]
pub trait ActorProvider: Send + Sync {
    /// The provider's static identity.
    fn identity(&self) -> &ProviderIdentity;

    /// Canonicalize a raw id (trim, case-fold) before lookup.
    ///
    /// Returns an empty string for ids this provider can never serve;
    /// callers translate that into [`InvalidId`](crate::Error::InvalidId).
    fn normalize_id(&self, id: &str) -> String {
        id.trim().to_string()
    }

    /// Extract the provider id from one of this provider's URLs.
    fn parse_id_from_url(&self, url: &str) -> Result<String>;

    /// Fetch the full record for an id.
    async fn fetch_by_id(&self, id: &str) -> Result<ActorInfo>;

    /// Fetch the full record behind one of this provider's URLs.
    async fn fetch_by_url(&self, url: &str) -> Result<ActorInfo>;

    /// The keyword-search capability, if this provider has one.
    fn searcher(&self) -> Option<&dyn ActorSearcher> {
        None
    }
}

/// Optional keyword-search capability of an [`ActorProvider`].
#[async_trait]
pub trait ActorSearcher: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<ActorSearchResult>>;
}

/// A movie metadata provider.
#[async_trait]
pub trait MovieProvider: Send + Sync {
    /// The provider's static identity.
    fn identity(&self) -> &ProviderIdentity;

    /// Canonicalize a raw id (trim, case-fold) before lookup.
    fn normalize_id(&self, id: &str) -> String {
        id.trim().to_string()
    }

    /// Extract the provider id from one of this provider's URLs.
    fn parse_id_from_url(&self, url: &str) -> Result<String>;

    /// Fetch the full record for an id.
    async fn fetch_by_id(&self, id: &str) -> Result<MovieInfo>;

    /// Fetch the full record behind one of this provider's URLs.
    async fn fetch_by_url(&self, url: &str) -> Result<MovieInfo>;

    /// The keyword-search capability, if this provider has one.
    fn searcher(&self) -> Option<&dyn MovieSearcher> {
        None
    }
}

/// Optional keyword-search capability of a [`MovieProvider`].
#[async_trait]
pub trait MovieSearcher: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<MovieSearchResult>>;
}
