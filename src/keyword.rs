//! Keyword normalization applied before orchestration.
//!
//! Raw keywords often arrive as media filenames. [`clean`] strips the
//! extension, resolution/codec/rip tags, and bracketed release-group
//! noise; [`split_names`] breaks a multi-actor string into individual
//! names. Both are pure functions; the orchestrator itself only rejects
//! keywords that normalize to nothing.

/// File extensions that never belong in a search keyword.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "wmv", "mov", "flv", "ts", "m2ts", "rmvb", "iso",
];

/// Tokens that are release noise, matched case-insensitively.
const NOISE_TOKENS: &[&str] = &[
    "1080p", "720p", "480p", "2160p", "4k", "8k", "uhd", "fhd", "hd", "sd",
    "x264", "x265", "h264", "h265", "hevc", "avc", "aac", "flac",
    "bluray", "blu-ray", "bdrip", "brrip", "webrip", "web-dl", "webdl",
    "hdtv", "dvdrip", "remux", "uncensored", "leaked", "chinese", "subbed",
];

/// Normalize a raw keyword for search.
///
/// Removes a trailing video extension, `[...]`/`(...)` groups, known
/// resolution/codec/rip tokens, and collapses separators to single
/// spaces. Returns an empty string when nothing meaningful survives.
pub fn clean(raw: &str) -> String {
    let mut s = raw.trim().to_string();

    // Trailing extension.
    if let Some((stem, ext)) = s.rsplit_once('.') {
        if VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            s = stem.to_string();
        }
    }

    // Bracketed groups are release tags, not content.
    s = strip_groups(&s, '[', ']');
    s = strip_groups(&s, '(', ')');

    // Tokenize on separators and drop noise tokens.
    let kept: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || c == '.' || c == '_')
        .filter(|tok| !tok.is_empty())
        .filter(|tok| !NOISE_TOKENS.contains(&tok.to_lowercase().as_str()))
        .collect();

    kept.join(" ").trim().to_string()
}

/// Split a multi-actor keyword into individual names.
///
/// Handles the separators seen in the wild: `,`, `、`, `/`, `&`, `・`
/// and the word "and" is left alone since it appears inside real names.
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(|c| matches!(c, ',' | '、' | '/' | '&' | '・'))
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

/// Remove `open...close` groups, non-nested, unbalanced pairs left as-is.
fn strip_groups(s: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(c);
        }
    }
    out
}
