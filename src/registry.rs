//! Explicit provider registry.
//!
//! The registry is an ordinary value passed by reference into the
//! resolver and aggregator, never process-global state, so tests can run
//! against isolated fake registries. Each entry pairs a provider with its
//! effective priority; config overrides are applied once at startup and
//! a priority of exactly `0` disables the provider for the process
//! lifetime (records already cached are not purged).

use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::provider::{ActorProvider, MovieProvider};

/// A registered provider with its effective priority.
pub struct Registered<P: ?Sized> {
    pub provider: Arc<P>,
    pub priority: f64,
}

// Manual impl: `Arc<P>` clones without requiring `P: Clone`.
impl<P: ?Sized> Clone for Registered<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            priority: self.priority,
        }
    }
}

impl<P: ?Sized> Registered<P> {
    /// Disabled providers are excluded from orchestration, not removed.
    pub fn is_enabled(&self) -> bool {
        self.priority > 0.0
    }
}

/// Registry of actor and movie providers.
#[derive(Default)]
pub struct ProviderRegistry {
    actors: Vec<Registered<dyn ActorProvider>>,
    movies: Vec<Registered<dyn MovieProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor provider with its default priority.
    pub fn register_actor(&mut self, provider: Arc<dyn ActorProvider>, priority: f64) {
        self.actors.push(Registered { provider, priority });
    }

    /// Register a movie provider with its default priority.
    pub fn register_movie(&mut self, provider: Arc<dyn MovieProvider>, priority: f64) {
        self.movies.push(Registered { provider, priority });
    }

    /// Apply config priority overrides. `0` disables a provider.
    pub fn apply_overrides(&mut self, config: &ProvidersConfig) {
        for entry in &mut self.actors {
            if let Some(p) = config.priority.get(&entry.provider.identity().name) {
                entry.priority = *p;
            }
        }
        for entry in &mut self.movies {
            if let Some(p) = config.priority.get(&entry.provider.identity().name) {
                entry.priority = *p;
            }
        }
    }

    /// Look up an enabled actor provider by name.
    ///
    /// Disabled providers are invisible here; every orchestration path
    /// goes through this lookup, so a priority-zero override removes the
    /// provider from resolution and search alike.
    pub fn actor(&self, name: &str) -> Result<&Registered<dyn ActorProvider>> {
        self.actors
            .iter()
            .find(|e| e.provider.identity().name == name && e.is_enabled())
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }

    /// Look up an enabled movie provider by name.
    pub fn movie(&self, name: &str) -> Result<&Registered<dyn MovieProvider>> {
        self.movies
            .iter()
            .find(|e| e.provider.identity().name == name && e.is_enabled())
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }

    /// Enabled actor providers, in registration order.
    pub fn enabled_actors(&self) -> Vec<Registered<dyn ActorProvider>> {
        self.actors
            .iter()
            .filter(|e| e.is_enabled())
            .cloned()
            .collect()
    }

    /// Enabled movie providers, in registration order.
    pub fn enabled_movies(&self) -> Vec<Registered<dyn MovieProvider>> {
        self.movies
            .iter()
            .filter(|e| e.is_enabled())
            .cloned()
            .collect()
    }

    /// All registrations, for status listings.
    pub fn actor_entries(&self) -> &[Registered<dyn ActorProvider>] {
        &self.actors
    }

    /// All registrations, for status listings.
    pub fn movie_entries(&self) -> &[Registered<dyn MovieProvider>] {
        &self.movies
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty() && self.movies.is_empty()
    }
}
