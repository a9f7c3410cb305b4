//! Error taxonomy for metaharvest.
//!
//! Every failure the core can surface maps to a stable, documented
//! HTTP-style status code via [`Error::status_code`], so API boundaries
//! can translate errors without matching on variants.

/// Errors surfaced by the aggregation core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The search keyword normalized to an empty string.
    #[error("invalid keyword: {0}")]
    InvalidKeyword(String),

    /// A provider id was empty or failed provider-side normalization.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A URL could not be mapped to a provider id.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A canonical `provider:id` key failed to parse.
    #[error("invalid provider key: {0}")]
    InvalidKey(String),

    /// The provider has no record for the requested id.
    #[error("metadata not found")]
    InfoNotFound,

    /// The provider has no image for the requested record.
    #[error("image not found")]
    ImageNotFound,

    /// No provider registered under the given name, or none enabled.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// A fetched record is missing its required minimum fields.
    #[error("incomplete metadata: {0}")]
    IncompleteMetadata(String),

    /// Every attempted provider failed; the joined per-provider errors.
    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),

    /// A provider did not report back before the caller's deadline.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// Cache store read/write failure that could not be recovered locally.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// A record failed to encode or decode as JSON for storage.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// HTTP transport failure from a provider adapter.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    /// The stable numeric tag for this error kind.
    ///
    /// `Invalid*` map to 400, `*NotFound` to 404, incomplete or joined
    /// failures and storage errors to 500, transport failures to 502.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidKeyword(_)
            | Error::InvalidId(_)
            | Error::InvalidUrl(_)
            | Error::InvalidKey(_) => 400,
            Error::InfoNotFound | Error::ImageNotFound | Error::ProviderNotFound(_) => 404,
            Error::IncompleteMetadata(_)
            | Error::AllProvidersFailed(_)
            | Error::Storage(_)
            | Error::Encoding(_) => 500,
            Error::Transport(_) => 502,
            Error::Timeout(_) => 504,
        }
    }

    /// `true` for the kinds that mean "the entity simply does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::InfoNotFound | Error::ImageNotFound)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
