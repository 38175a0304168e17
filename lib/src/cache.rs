use std::sync::Arc;

use indexmap::IndexMap;
use log::*;

use crate::errors::CompileError;
use crate::{Limits, Regexp};

/// Default capacity of a [`RegexpCache`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// Cache of compiled regexps, keyed by delimited pattern text.
///
/// Looking up a pattern that is not in the cache compiles it with
/// [`Regexp::parse`] and stores the result. When the cache is full, the
/// least recently used entry is evicted. Compile errors are not cached.
///
/// The cache is an ordinary value, callers that need to share it between
/// threads can wrap it in a [`std::sync::Mutex`]. The regexps it returns are
/// reference counted and remain valid after being evicted.
///
/// ```
/// # use backre::RegexpCache;
/// let mut cache = RegexpCache::new(2);
/// let a = cache.get("/a+/").unwrap();
/// let b = cache.get("/a+/").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug)]
pub struct RegexpCache {
    // Entries are ordered from least to most recently used.
    entries: IndexMap<String, Arc<Regexp>>,
    capacity: usize,
    limits: Limits,
}

impl Default for RegexpCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RegexpCache {
    /// Creates a cache that holds up to `capacity` regexps. With capacity 0
    /// every lookup compiles the pattern and nothing is stored.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            limits: Limits::default(),
        }
    }

    /// Sets the limits given to the regexps compiled by this cache.
    /// Regexps that are already in the cache are discarded.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self.entries.clear();
        self
    }

    /// Returns the compiled regexp for a delimited pattern, compiling it
    /// if it's not in the cache.
    pub fn get(&mut self, delimited: &str) -> Result<Arc<Regexp>, CompileError> {
        if let Some(regexp) = self.entries.shift_remove(delimited) {
            debug!("regexp cache hit: {}", delimited);
            self.entries.insert(delimited.to_string(), regexp.clone());
            return Ok(regexp);
        }

        debug!("regexp cache miss: {}", delimited);

        let regexp = Arc::new(Regexp::parse(delimited)?.with_limits(self.limits));

        if self.capacity == 0 {
            return Ok(regexp);
        }

        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!("regexp cache eviction: {}", evicted);
            }
        }

        self.entries.insert(delimited.to_string(), regexp.clone());
        Ok(regexp)
    }

    /// Number of regexps in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of regexps in the cache.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all the regexps from the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::RegexpCache;
    use crate::errors::CompileError;
    use crate::Limits;

    #[test]
    fn hits_return_the_same_regexp() {
        let mut cache = RegexpCache::default();
        assert_eq!(cache.capacity(), 1024);
        assert!(cache.is_empty());

        let a = cache.get("/a(b)c/i").unwrap();
        let b = cache.get("/a(b)c/i").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        // Same pattern with different flags is a different entry.
        let c = cache.get("/a(b)c/").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let mut cache = RegexpCache::new(2);
        let a = cache.get("/a/").unwrap();
        cache.get("/b/").unwrap();

        // Using `/a/` makes `/b/` the least recently used entry.
        cache.get("/a/").unwrap();
        cache.get("/c/").unwrap();
        assert_eq!(cache.len(), 2);

        assert!(Arc::ptr_eq(&a, &cache.get("/a/").unwrap()));

        // `/b/` was evicted, getting it again evicts `/c/`.
        cache.get("/b/").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&a, &cache.get("/a/").unwrap()));
    }

    #[test]
    fn zero_capacity() {
        let mut cache = RegexpCache::new(0);
        let a = cache.get("/a/").unwrap();
        let b = cache.get("/a/").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = RegexpCache::new(4);
        assert_eq!(
            cache.get("/a(/").unwrap_err(),
            CompileError::UnterminatedGroup { offset: 1 }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn limits_are_applied() {
        let limits = Limits::default().max_steps(Some(10));
        let mut cache = RegexpCache::new(4).with_limits(limits);
        assert_eq!(cache.get("/a/").unwrap().limits(), limits);

        cache.clear();
        assert!(cache.is_empty());
    }
}
