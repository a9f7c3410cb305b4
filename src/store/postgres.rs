//! Postgres cache backend.
//!
//! Suitable for multi-process deployments. `migrate` provisions the
//! `citext` extension for case-insensitive key columns and `pg_trgm` for
//! fuzzy search; `search_*` matches exactly (case-insensitively) or by
//! trigram similarity against the per-query threshold, ordered by
//! descending similarity.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ActorInfo, MovieInfo};
use crate::store::{CacheStore, SearchQuery};

use super::{decode_row, reject_invalid};

/// Postgres-backed [`CacheStore`].
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the database named by `dsn`.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheStore for PostgresStore {
    async fn migrate(&self) -> Result<()> {
        // citext gives the key columns a case-insensitive collation;
        // pg_trgm backs the fuzzy search and its GIN indexes.
        sqlx::query("CREATE EXTENSION IF NOT EXISTS citext")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actor_info (
                provider CITEXT NOT NULL,
                id CITEXT NOT NULL,
                name CITEXT NOT NULL,
                data JSONB NOT NULL,
                updated_at BIGINT NOT NULL,
                PRIMARY KEY (provider, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS movie_info (
                provider CITEXT NOT NULL,
                id CITEXT NOT NULL,
                number CITEXT NOT NULL,
                title TEXT NOT NULL,
                data JSONB NOT NULL,
                updated_at BIGINT NOT NULL,
                PRIMARY KEY (provider, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_actor_info_name ON actor_info(name)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_actor_info_name_trgm \
             ON actor_info USING GIN ((name::text) gin_trgm_ops)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_movie_info_number ON movie_info(number)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_movie_info_number_trgm \
             ON movie_info USING GIN ((number::text) gin_trgm_ops)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_actor(&self, provider: &str, id: &str) -> Result<Option<ActorInfo>> {
        let row = sqlx::query("SELECT data::text AS data FROM actor_info WHERE provider = $1 AND id = $2")
            .bind(provider)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| decode_row(&r.get::<String, _>("data"), provider, id)))
    }

    async fn get_movie(&self, provider: &str, id: &str) -> Result<Option<MovieInfo>> {
        let row = sqlx::query("SELECT data::text AS data FROM movie_info WHERE provider = $1 AND id = $2")
            .bind(provider)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| decode_row(&r.get::<String, _>("data"), provider, id)))
    }

    async fn put_actor(&self, info: &ActorInfo) -> Result<()> {
        reject_invalid(info.is_valid(), &info.provider, &info.id)?;

        let data = serde_json::to_string(info)?;
        sqlx::query(
            r#"
            INSERT INTO actor_info (provider, id, name, data, updated_at)
            VALUES ($1, $2, $3, $4::jsonb, $5)
            ON CONFLICT (provider, id) DO UPDATE SET
                name = excluded.name,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&info.provider)
        .bind(&info.id)
        .bind(&info.name)
        .bind(&data)
        .bind(info.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn put_movie(&self, info: &MovieInfo) -> Result<()> {
        reject_invalid(info.is_valid(), &info.provider, &info.id)?;

        let data = serde_json::to_string(info)?;
        sqlx::query(
            r#"
            INSERT INTO movie_info (provider, id, number, title, data, updated_at)
            VALUES ($1, $2, $3, $4, $5::jsonb, $6)
            ON CONFLICT (provider, id) DO UPDATE SET
                number = excluded.number,
                title = excluded.title,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&info.provider)
        .bind(&info.id)
        .bind(&info.number)
        .bind(&info.title)
        .bind(&data)
        .bind(info.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search_actors(&self, keyword: &str, query: &SearchQuery) -> Result<Vec<ActorInfo>> {
        let rows = match &query.provider {
            Some(provider) => {
                sqlx::query(
                    "SELECT data::text AS data FROM actor_info \
                     WHERE provider = $1 \
                       AND (name = $2 OR similarity(name::text, $2) >= $3) \
                     ORDER BY similarity(name::text, $2) DESC \
                     LIMIT $4 OFFSET $5",
                )
                .bind(provider)
                .bind(keyword)
                .bind(query.threshold as f32)
                .bind(query.effective_limit())
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT data::text AS data FROM actor_info \
                     WHERE name = $1 OR similarity(name::text, $1) >= $2 \
                     ORDER BY similarity(name::text, $1) DESC \
                     LIMIT $3 OFFSET $4",
                )
                .bind(keyword)
                .bind(query.threshold as f32)
                .bind(query.effective_limit())
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .iter()
            .filter_map(|r| decode_row(&r.get::<String, _>("data"), "actor_info", keyword))
            .collect())
    }

    async fn search_movies(&self, keyword: &str, query: &SearchQuery) -> Result<Vec<MovieInfo>> {
        let rows = match &query.provider {
            Some(provider) => {
                sqlx::query(
                    "SELECT data::text AS data FROM movie_info \
                     WHERE provider = $1 \
                       AND (number = $2 OR similarity(number::text, $2) >= $3) \
                     ORDER BY similarity(number::text, $2) DESC \
                     LIMIT $4 OFFSET $5",
                )
                .bind(provider)
                .bind(keyword)
                .bind(query.threshold as f32)
                .bind(query.effective_limit())
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT data::text AS data FROM movie_info \
                     WHERE number = $1 OR similarity(number::text, $1) >= $2 \
                     ORDER BY similarity(number::text, $1) DESC \
                     LIMIT $3 OFFSET $4",
                )
                .bind(keyword)
                .bind(query.threshold as f32)
                .bind(query.effective_limit())
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .iter()
            .filter_map(|r| decode_row(&r.get::<String, _>("data"), "movie_info", keyword))
            .collect())
    }
}
