//! # metaharvest
//!
//! Multi-provider media metadata aggregation with a persistent
//! read-through cache.
//!
//! metaharvest fans a query out to any number of registered metadata
//! providers concurrently, merges their results with a database-backed
//! fallback, deduplicates records describing the same real-world entity,
//! and returns a deterministically ordered result list even under
//! partial provider failure.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Providers   │──▶│  Aggregator  │──▶│  CacheStore   │
//! │ (out of tree)│   │ fan-out/merge│   │ SQLite/PG     │
//! └─────────────┘   └──────┬───────┘   └──────┬────────┘
//!                          │                  │
//!                          ▼                  ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │ Resolver │       │   CLI    │
//!                    │ lazy get │       │  (mh)    │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`provider_id`] | Canonical `provider:id` entity keys |
//! | [`dedup`] | Insertion-ordered deduplicating set |
//! | [`rank`] | Stable priority/similarity ranking |
//! | [`similarity`] | Levenshtein-ratio string similarity |
//! | [`models`] | Actor/movie records and search projections |
//! | [`store`] | Cache storage trait and SQLite/Postgres backends |
//! | [`provider`] | Capability traits for provider adapters |
//! | [`registry`] | Explicit provider registry with priorities |
//! | [`resolver`] | Lazy get-or-fetch-and-store |
//! | [`aggregate`] | Concurrent search orchestration |
//! | [`keyword`] | Pre-search keyword normalization |
//! | [`config`] | TOML configuration |

pub mod aggregate;
pub mod config;
pub mod dedup;
pub mod error;
pub mod keyword;
pub mod models;
pub mod provider;
pub mod provider_id;
pub mod rank;
pub mod registry;
pub mod resolver;
pub mod similarity;
pub mod store;

pub use aggregate::Aggregator;
pub use error::{Error, Result};
pub use models::{ActorInfo, ActorSearchResult, MovieInfo, MovieSearchResult};
pub use provider_id::ProviderId;
pub use registry::ProviderRegistry;
pub use resolver::Resolver;
pub use store::CacheStore;
