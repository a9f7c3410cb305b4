//! # metaharvest CLI (`mh`)
//!
//! The `mh` binary drives the aggregation core against the configured
//! cache store. Provider adapters are registered by embedding
//! applications; a bare `mh` still functions as a cache inspection and
//! query tool through the `--fallback` flag.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mh init` | Create the database schema (idempotent) |
//! | `mh providers` | List registered providers and priorities |
//! | `mh search-movie "<keyword>"` | Search movie metadata |
//! | `mh search-actor "<keyword>"` | Search actor metadata |
//! | `mh get-movie <provider:id>` | Resolve one movie record |
//! | `mh get-actor <provider:id>` | Resolve one actor record |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use metaharvest::aggregate::Aggregator;
use metaharvest::config::{load_config, Config};
use metaharvest::dedup::OrderedSet;
use metaharvest::keyword;
use metaharvest::provider_id::ProviderId;
use metaharvest::registry::ProviderRegistry;
use metaharvest::resolver::Resolver;
use metaharvest::store::postgres::PostgresStore;
use metaharvest::store::sqlite::SqliteStore;
use metaharvest::store::CacheStore;

/// metaharvest — multi-provider media metadata aggregation with a
/// persistent read-through cache.
#[derive(Parser)]
#[command(
    name = "mh",
    about = "Multi-provider media metadata aggregation with a persistent cache",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./mh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// List registered providers, their priorities and enabled state.
    Providers,

    /// Search movie metadata across providers and/or the cache.
    SearchMovie {
        /// The search keyword; filename noise is stripped first.
        keyword: String,

        /// Query only this provider.
        #[arg(long)]
        provider: Option<String>,

        /// Merge cached records into the result.
        #[arg(long)]
        fallback: bool,
    },

    /// Search actor metadata across providers and/or the cache.
    SearchActor {
        /// The search keyword; may contain several names.
        keyword: String,

        /// Query only this provider.
        #[arg(long)]
        provider: Option<String>,

        /// Merge cached records into the result.
        #[arg(long)]
        fallback: bool,
    },

    /// Resolve one movie record by its canonical `provider:id` key.
    GetMovie {
        /// Canonical key, e.g. `FANZA:mdx0109`.
        key: String,

        /// Prefer a valid cached record over a live fetch.
        #[arg(long)]
        lazy: bool,
    },

    /// Resolve one actor record by its canonical `provider:id` key.
    GetActor {
        /// Canonical key, e.g. `XSLIST:24490`.
        key: String,

        /// Prefer a valid cached record over a live fetch.
        #[arg(long)]
        lazy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        Config::default()
    };

    let store = open_store(&config).await?;

    // Adapters are registered here by embedding applications; the stock
    // binary ships with an empty registry and leans on the cache.
    let mut registry = ProviderRegistry::new();
    registry.apply_overrides(&config.providers);
    let registry = Arc::new(registry);

    match cli.command {
        Commands::Init => {
            store.migrate().await?;
            println!("Database schema is up to date.");
        }

        Commands::Providers => {
            if registry.is_empty() {
                println!("No providers registered.");
                return Ok(());
            }
            println!("{:<16} {:<8} {:<10} ENABLED", "PROVIDER", "KIND", "PRIORITY");
            for entry in registry.movie_entries() {
                let identity = entry.provider.identity();
                println!(
                    "{:<16} {:<8} {:<10} {}",
                    identity.name,
                    "movie",
                    entry.priority,
                    entry.is_enabled()
                );
            }
            for entry in registry.actor_entries() {
                let identity = entry.provider.identity();
                println!(
                    "{:<16} {:<8} {:<10} {}",
                    identity.name,
                    "actor",
                    entry.priority,
                    entry.is_enabled()
                );
            }
        }

        Commands::SearchMovie {
            keyword: raw,
            provider,
            fallback,
        } => {
            let cleaned = keyword::clean(&raw);
            let aggregator = Aggregator::new(store, registry, config.search.clone());
            let results = match provider {
                Some(name) => aggregator.search_movies_one(&cleaned, &name, fallback).await?,
                None => aggregator.search_movies_all(&cleaned, fallback, None).await?,
            };
            if results.is_empty() {
                println!("No results.");
            }
            for r in results {
                let key = ProviderId::new(&r.provider, &r.id)?.to_string();
                println!("{key:<24} {:<12} {}", r.number, r.title);
            }
        }

        Commands::SearchActor {
            keyword: raw,
            provider,
            fallback,
        } => {
            let cleaned = keyword::clean(&raw);
            let names = keyword::split_names(&cleaned);
            if names.is_empty() {
                anyhow::bail!("keyword is empty after cleanup: {raw:?}");
            }
            let aggregator = Aggregator::new(store, registry, config.search.clone());
            // Multi-actor keywords search once per name, merged and deduplicated.
            let mut set = OrderedSet::new(|r: &metaharvest::ActorSearchResult| r.key());
            for name in &names {
                let results = match &provider {
                    Some(p) => aggregator.search_actors_one(name, p, fallback).await?,
                    None => aggregator.search_actors_all(name, fallback, None).await?,
                };
                set.extend(results);
            }
            let results = set.into_vec();
            if results.is_empty() {
                println!("No results.");
            }
            for r in results {
                let key = ProviderId::new(&r.provider, &r.id)?.to_string();
                println!("{key:<24} {}", r.name);
            }
        }

        Commands::GetMovie { key, lazy } => {
            let key = ProviderId::parse(&key)?;
            let resolver = Resolver::new(store, registry);
            let info = resolver.movie(&key.provider, &key.id, lazy).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::GetActor { key, lazy } => {
            let key = ProviderId::parse(&key)?;
            let resolver = Resolver::new(store, registry);
            let info = resolver.actor(&key.provider, &key.id, lazy).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn CacheStore>> {
    match config.database.backend.as_str() {
        "postgres" => {
            let dsn = config
                .database
                .dsn
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("database.dsn is required for postgres"))?;
            Ok(Arc::new(PostgresStore::connect(dsn).await?))
        }
        _ => Ok(Arc::new(SqliteStore::open(&config.database.path).await?)),
    }
}
