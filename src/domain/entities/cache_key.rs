//! Content addresses for remotely fetched assets.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Extension used when the source URL carries none.
pub const DEFAULT_EXTENSION: &str = "dat";

/// Length of a hex-encoded SHA-256 digest.
pub const KEY_HEX_LEN: usize = 64;

/// Stable cache key derived from a URL string.
///
/// The key is the lowercase hex SHA-256 of the URL exactly as given, so the same
/// URL maps to the same key across calls and process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `stem` looks like a key this type produces.
    #[must_use]
    pub fn is_key_like(stem: &str) -> bool {
        stem.len() == KEY_HEX_LEN
            && stem
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the path extension of a URL, if any.
///
/// Query strings and fragments are ignored. Strings that do not parse as URLs are
/// treated as plain paths.
#[must_use]
pub fn url_path_extension(url: &str) -> Option<String> {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(String::from)
}

/// Returns `<key>.<ext>` for a URL, using [`DEFAULT_EXTENSION`] when the URL has none.
#[must_use]
pub fn cache_file_name(url: &str) -> String {
    let key = CacheKey::from_url(url);
    let ext = url_path_extension(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{key}.{ext}")
}
