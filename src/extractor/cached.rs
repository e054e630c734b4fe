//! Cached page source implementation
//!
//! This module provides a caching wrapper for page sources that keeps
//! extracted metadata per URL for a limited time, so rendering several
//! attributes of the same media record fetches the page only once.

use super::{ExtractedMetadata, PodcastPageSource};
use crate::fetcher::FetchError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// A cached extraction result and the moment it was produced
struct CacheEntry {
    fetched_at: Instant,
    metadata: ExtractedMetadata,
}

/// A caching wrapper for page sources
///
/// Entries are keyed by page URL and live for `ttl`. The cache belongs to
/// this value alone; drop it (or call `clear`) to end its scope. Failed
/// extractions are not cached.
pub struct CachedExtractor<S>
where
    S: PodcastPageSource,
{
    /// The underlying page source
    source: S,
    /// How long an entry is served before the page is fetched again
    ttl: Duration,
    /// Extracted metadata by page URL
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<S> CachedExtractor<S>
where
    S: PodcastPageSource,
{
    /// Creates a new cached source wrapping the given source
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let extractor = LibsynExtractor::new(HttpFetcher::new()?);
    /// let cached = CachedExtractor::new(extractor, Duration::from_secs(3600));
    /// ```
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Forgets the cached metadata for `url`
    pub fn invalidate(&self, url: &str) {
        self.lock().remove(url);
    }

    /// Forgets all cached metadata
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached URLs
    ///
    /// Expired entries are pruned whenever a fresh result is stored, so this
    /// may still count entries that expired since the last store.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // The map holds no invariants a panicking holder could break
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> PodcastPageSource for CachedExtractor<S>
where
    S: PodcastPageSource,
{
    fn extract(&self, url: &str) -> Result<ExtractedMetadata, FetchError> {
        if let Some(entry) = self.lock().get(url) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!(%url, "Serving episode page metadata from cache");
                return Ok(entry.metadata.clone());
            }
        }

        // Fetch without holding the lock; concurrent misses may both fetch
        let metadata = self.source.extract(url)?;

        let mut entries = self.lock();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        entries.insert(
            url.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                metadata: metadata.clone(),
            },
        );

        Ok(metadata)
    }
}
