//! Embedded SQLite cache backend.
//!
//! Suitable for the common single-process case. Case-insensitive matching
//! comes from `COLLATE NOCASE` on the key columns; fuzzy search is a
//! case-insensitive substring match (`LIKE %keyword%`), strictly looser
//! than the Postgres trigram search and with no threshold parameter.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ActorInfo, MovieInfo};
use crate::store::{CacheStore, SearchQuery};

use super::{decode_row, reject_invalid};

/// SQLite-backed [`CacheStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (and create if missing) the database file at `path`,
    /// creating missing parent directories first.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open an in-memory database. Used by tests and throwaway runs.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actor_info (
                provider TEXT NOT NULL COLLATE NOCASE,
                id TEXT NOT NULL COLLATE NOCASE,
                name TEXT NOT NULL COLLATE NOCASE,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (provider, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS movie_info (
                provider TEXT NOT NULL COLLATE NOCASE,
                id TEXT NOT NULL COLLATE NOCASE,
                number TEXT NOT NULL COLLATE NOCASE,
                title TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (provider, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_actor_info_name ON actor_info(name)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_movie_info_number ON movie_info(number)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_actor(&self, provider: &str, id: &str) -> Result<Option<ActorInfo>> {
        let row = sqlx::query("SELECT data FROM actor_info WHERE provider = ?1 AND id = ?2")
            .bind(provider)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| decode_row(&r.get::<String, _>("data"), provider, id)))
    }

    async fn get_movie(&self, provider: &str, id: &str) -> Result<Option<MovieInfo>> {
        let row = sqlx::query("SELECT data FROM movie_info WHERE provider = ?1 AND id = ?2")
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
            VALUES (?1, ?2, ?3, ?4, ?5)
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
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
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
        let pattern = format!("%{}%", keyword);
        let rows = match &query.provider {
            Some(provider) => {
                sqlx::query(
                    "SELECT data FROM actor_info \
                     WHERE provider = ?1 AND name LIKE ?2 \
                     ORDER BY name LIMIT ?3 OFFSET ?4",
                )
                .bind(provider)
                .bind(&pattern)
                .bind(query.effective_limit())
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT data FROM actor_info \
                     WHERE name LIKE ?1 \
                     ORDER BY name LIMIT ?2 OFFSET ?3",
                )
                .bind(&pattern)
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
        let pattern = format!("%{}%", keyword);
        let rows = match &query.provider {
            Some(provider) => {
                sqlx::query(
                    "SELECT data FROM movie_info \
                     WHERE provider = ?1 AND number LIKE ?2 \
                     ORDER BY number LIMIT ?3 OFFSET ?4",
                )
                .bind(provider)
                .bind(&pattern)
                .bind(query.effective_limit())
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT data FROM movie_info \
                     WHERE number LIKE ?1 \
                     ORDER BY number LIMIT ?2 OFFSET ?3",
                )
                .bind(&pattern)
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
