//! Two-tier MCC category cache shared by the enrichment workers.
//!
//! The static tier is seeded once from the reference file at construction;
//! the dynamic tier collects codes learned from the reference site during
//! the run. Both tiers live in one map: entries are append-only and never
//! overwritten, so whichever of two concurrent fetches for the same code
//! lands first wins and the other resolves to the same value.
//!
//! The lock is held only around map access, never across a network fetch,
//! so resolves for different codes proceed independently.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;

use crate::remote::CodeSource;

pub struct CategoryCache {
    entries: RwLock<HashMap<u32, String>>,
    source: Box<dyn CodeSource>,
    seeded: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CategoryCache {
    pub fn new(seed: HashMap<u32, String>, source: Box<dyn CodeSource>) -> Self {
        let seeded = seed.len();
        Self {
            entries: RwLock::new(seed),
            source,
            seeded,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached name for `code`, if either tier has it. Never touches the network.
    pub fn lookup(&self, code: u32) -> Option<String> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(&code).cloned()
    }

    /// Cached name for `code`, fetching and remembering it on a miss.
    ///
    /// A failed fetch propagates to the caller and leaves the cache
    /// unchanged; failures are not cached.
    pub fn resolve(&self, code: u32) -> Result<String> {
        if let Some(name) = self.lookup(code) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(name);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let name = self.source.fetch(code)?;

        let mut entries = self.entries.write().expect("cache lock poisoned");
        Ok(entries.entry(code).or_insert(name).clone())
    }

    /// Point-in-time copy of both tiers, for persistence.
    pub fn snapshot(&self) -> HashMap<u32, String> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.clone()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries learned from the reference site during this run.
    pub fn learned(&self) -> usize {
        self.len().saturating_sub(self.seeded)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;

    struct FakeSource {
        names: HashMap<u32, String>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(entries: &[(u32, &str)]) -> Self {
            Self {
                names: entries
                    .iter()
                    .map(|(code, name)| (*code, name.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CodeSource for FakeSource {
        fn fetch(&self, code: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.names.get(&code) {
                Some(name) => Ok(name.clone()),
                None => Err(Error::CodeNotFound { code }.into()),
            }
        }
    }

    fn seed(entries: &[(u32, &str)]) -> HashMap<u32, String> {
        entries
            .iter()
            .map(|(code, name)| (*code, name.to_string()))
            .collect()
    }

    #[test]
    fn static_tier_resolves_without_fetching() {
        let cache = CategoryCache::new(
            seed(&[(5812, "Eating places")]),
            Box::new(FakeSource::new(&[])),
        );

        assert_eq!(cache.resolve(5812).unwrap(), "Eating places");
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn second_resolve_of_a_learned_code_is_a_hit() {
        let cache = CategoryCache::new(
            HashMap::new(),
            Box::new(FakeSource::new(&[(5411, "Grocery stores")])),
        );

        assert_eq!(cache.resolve(5411).unwrap(), "Grocery stores");
        assert_eq!(cache.resolve(5411).unwrap(), "Grocery stores");

        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.learned(), 1);
    }

    #[test]
    fn lookup_never_fetches() {
        let cache = CategoryCache::new(HashMap::new(), Box::new(FakeSource::new(&[])));
        assert_eq!(cache.lookup(5411), None);
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn failed_fetch_leaves_cache_unchanged() {
        let cache = CategoryCache::new(HashMap::new(), Box::new(FakeSource::new(&[])));

        let err = cache.resolve(4900).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::CodeNotFound { code: 4900 })
        ));
        assert_eq!(cache.lookup(4900), None);
        assert_eq!(cache.len(), 0);

        // No negative caching: the next resolve tries the source again.
        let _ = cache.resolve(4900);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn snapshot_merges_both_tiers() {
        let cache = CategoryCache::new(
            seed(&[(5812, "Eating places")]),
            Box::new(FakeSource::new(&[(5411, "Grocery stores")])),
        );
        cache.resolve(5411).unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&5812], "Eating places");
        assert_eq!(snapshot[&5411], "Grocery stores");
    }

    #[test]
    fn concurrent_resolves_populate_the_dynamic_tier() {
        let source = FakeSource::new(&[
            (5411, "Grocery stores"),
            (5812, "Eating places"),
            (5912, "Drug stores"),
            (4111, "Local transport"),
        ]);
        let cache = CategoryCache::new(HashMap::new(), Box::new(source));

        let cache = &cache;
        std::thread::scope(|scope| {
            for code in [5411, 5812, 5912, 4111] {
                scope.spawn(move || cache.resolve(code).unwrap());
            }
        });

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.learned(), 4);
    }
}
