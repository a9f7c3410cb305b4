//! Core data models for metaharvest.
//!
//! Two durable record kinds flow through the system: [`ActorInfo`] and
//! [`MovieInfo`]. Each has a lightweight search-result projection used by
//! provider search and the orchestrator. A record must pass its validity
//! predicate before it is written to the cache or returned to a caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider_id::ProviderId;

/// Full actor metadata, the durable unit of persistence for actors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorInfo {
    pub provider: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ActorInfo {
    /// Minimum fields required before the record may be cached or returned.
    pub fn is_valid(&self) -> bool {
        !self.provider.is_empty() && !self.id.is_empty() && !self.name.is_empty()
    }

    /// The cache/dedup identity of this record.
    pub fn key(&self) -> ProviderId {
        ProviderId {
            provider: self.provider.clone(),
            id: self.id.clone(),
        }
    }
}

/// Full movie metadata, the durable unit of persistence for titles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieInfo {
    pub provider: String,
    pub id: String,
    /// Canonical release number (e.g. `MDX-0109`), the primary search field.
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl MovieInfo {
    /// Minimum fields required before the record may be cached or returned.
    pub fn is_valid(&self) -> bool {
        !self.provider.is_empty()
            && !self.id.is_empty()
            && !self.number.is_empty()
            && !self.title.is_empty()
    }

    /// The cache/dedup identity of this record.
    pub fn key(&self) -> ProviderId {
        ProviderId {
            provider: self.provider.clone(),
            id: self.id.clone(),
        }
    }
}

/// Lightweight actor projection returned from search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorSearchResult {
    pub provider: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ActorSearchResult {
    pub fn key(&self) -> ProviderId {
        ProviderId {
            provider: self.provider.clone(),
            id: self.id.clone(),
        }
    }
}

impl From<&ActorInfo> for ActorSearchResult {
    fn from(info: &ActorInfo) -> Self {
        Self {
            provider: info.provider.clone(),
            id: info.id.clone(),
            name: info.name.clone(),
            images: info.images.clone(),
        }
    }
}

/// Lightweight movie projection returned from search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSearchResult {
    pub provider: String,
    pub id: String,
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub actors: Vec<String>,
}

impl MovieSearchResult {
    pub fn key(&self) -> ProviderId {
        ProviderId {
            provider: self.provider.clone(),
            id: self.id.clone(),
        }
    }
}

impl From<&MovieInfo> for MovieSearchResult {
    fn from(info: &MovieInfo) -> Self {
        Self {
            provider: info.provider.clone(),
            id: info.id.clone(),
            number: info.number.clone(),
            title: info.title.clone(),
            cover: info.cover.clone(),
            thumb: info.thumb.clone(),
            actors: info.actors.clone(),
        }
    }
}
