//! Canonical `provider:id` entity keys.
//!
//! A [`ProviderId`] names one record at one provider and is the identity
//! used for cache lookups and cross-provider deduplication. The text form
//! is `provider:percent-encode(id)`, so ids containing `:` survive a
//! round trip. Some producers append a `:confidence` suffix (a 0–1 float
//! or bare `0`/`1`); parsing strips it without letting it leak into the id.

use std::fmt;

use crate::error::{Error, Result};

/// The `(provider, id)` identity of a single metadata record.
///
/// Both fields are guaranteed non-empty by [`ProviderId::parse`] and
/// [`ProviderId::new`]. Equality is case-sensitive on the raw pair; any
/// case normalization happens upstream in the provider's id normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId {
    pub provider: String,
    pub id: String,
}

impl ProviderId {
    /// Build a key from already-validated parts.
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let provider = provider.into();
        let id = id.into();
        if provider.is_empty() || id.is_empty() {
            return Err(Error::InvalidKey(format!("{provider}:{id}")));
        }
        Ok(Self { provider, id })
    }

    /// Parse the canonical text form.
    ///
    /// Splits on the first `:`, percent-decodes the id segment, and strips
    /// a trailing confidence suffix first. The suffix is only stripped when
    /// another separator remains, so `X:1` keeps `"1"` as its id while
    /// `X:a:1` parses to `{X, a}`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = strip_confidence(text);

        let (provider, encoded_id) = trimmed
            .split_once(':')
            .ok_or_else(|| Error::InvalidKey(text.to_string()))?;

        let id = urlencoding::decode(encoded_id)
            .map_err(|_| Error::InvalidKey(text.to_string()))?;

        if provider.is_empty() || id.is_empty() {
            return Err(Error::InvalidKey(text.to_string()));
        }

        Ok(Self {
            provider: provider.to_string(),
            id: id.into_owned(),
        })
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, urlencoding::encode(&self.id))
    }
}

/// Drop a trailing `:<confidence>` segment if one is present.
///
/// The remainder must still contain a `:` separator, otherwise the segment
/// is part of the id and is left alone.
fn strip_confidence(text: &str) -> &str {
    if let Some((head, tail)) = text.rsplit_once(':') {
        if head.contains(':') && is_confidence(tail) {
            return head;
        }
    }
    text
}

/// Matches `0`, `1`, or `0.x`/`1.x` with a digits-only fraction.
fn is_confidence(segment: &str) -> bool {
    let rest = match segment.strip_prefix('0').or_else(|| segment.strip_prefix('1')) {
        Some(rest) => rest,
        None => return false,
    };
    if rest.is_empty() {
        return true;
    }
    match rest.strip_prefix('.') {
        Some(frac) => !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
