//! Cache key normalization.

use std::fmt;

/// A normalized cache key derived from a query city.
///
/// Normalization lowercases, trims surrounding whitespace, and prefixes
/// with `weather:`, so `CacheKey::new("  Paris ")` and
/// `CacheKey::new("PARIS")` are equal. Keys are opaque to the cache itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a normalized cache key for the given city.
    pub fn new(city: &str) -> Self {
        Self(format!("weather:{}", city.trim().to_lowercase()))
    }

    /// The normalized string, e.g. `"weather:paris"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
