//! Recipe cache storage.
//!
//! Two independent slots share one TTL:
//!
//! - a capacity-bounded map of full recipe documents keyed by slug;
//! - a single slot holding the complete summary listing.
//!
//! Expiry is checked lazily when an entry is read. Nothing reclaims idle
//! entries in the background, so an expired document occupies a slot until it
//! is read, overwritten, or evicted.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use lru::LruCache;
use mealie_api_types::{RecipeDocument, RecipeSummary};
use metrics::counter;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A cached value and the instant it was last written.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, stored_at: Instant) -> Self {
        Self { value, stored_at }
    }

    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Point-in-time view of the cache, as reported by `cache_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_recipes: usize,
    pub max_size: usize,
    pub ttl: Duration,
    pub all_recipes_cached: bool,
}

/// TTL- and capacity-bounded store for recipe documents and the summary listing.
///
/// Reads never change eviction order: documents are looked up with
/// `LruCache::peek`, so the least-recently-used entry is always the one with
/// the oldest write. Overwriting a slug refreshes both its timestamp and its
/// position.
pub struct RecipeCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    recipes: RwLock<LruCache<String, CacheEntry<Arc<RecipeDocument>>>>,
    all_recipes: RwLock<Option<CacheEntry<Arc<Vec<RecipeSummary>>>>>,
}

impl RecipeCache {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = config.max_recipes_non_zero();
        Self {
            config,
            clock,
            recipes: RwLock::new(LruCache::new(capacity)),
            all_recipes: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ========================================================================
    // Recipe documents
    // ========================================================================

    /// Return the cached document for `slug` if it has not expired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, slug: &str) -> Option<Arc<RecipeDocument>> {
        let now = self.clock.now();
        let mut recipes = rw_write(&self.recipes, SOURCE, "get");

        let lookup = recipes.peek(slug).map(|entry| {
            entry
                .is_fresh(now, self.config.ttl)
                .then(|| Arc::clone(&entry.value))
        });
        let fresh = match lookup {
            Some(Some(document)) => Some(document),
            Some(None) => {
                recipes.pop(slug);
                counter!("mealie_cache_recipe_expired_total").increment(1);
                debug!(slug, "Purged expired recipe");
                None
            }
            None => None,
        };

        if fresh.is_some() {
            counter!("mealie_cache_recipe_hit_total").increment(1);
        } else {
            counter!("mealie_cache_recipe_miss_total").increment(1);
        }
        fresh
    }

    /// Insert or overwrite `slug`, evicting the oldest write when a new key
    /// would exceed capacity.
    pub fn set(&self, slug: impl Into<String>, document: RecipeDocument) -> Arc<RecipeDocument> {
        let slug = slug.into();
        let document = Arc::new(document);
        let entry = CacheEntry::new(Arc::clone(&document), self.clock.now());

        let evicted = rw_write(&self.recipes, SOURCE, "set").push(slug.clone(), entry);
        if let Some((evicted_slug, _)) = evicted.filter(|(key, _)| *key != slug) {
            counter!("mealie_cache_recipe_evict_total").increment(1);
            debug!(slug = %evicted_slug, "Evicted oldest cached recipe");
        }
        document
    }

    /// Remove one slug, or everything (including the summary listing) when
    /// `slug` is `None`.
    pub fn invalidate(&self, slug: Option<&str>) {
        match slug {
            Some(slug) => {
                rw_write(&self.recipes, SOURCE, "invalidate.one").pop(slug);
            }
            None => {
                rw_write(&self.recipes, SOURCE, "invalidate.all").clear();
                *rw_write(&self.all_recipes, SOURCE, "invalidate.all_recipes") = None;
            }
        }
    }

    /// Number of stored documents, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        rw_read(&self.recipes, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Summary listing
    // ========================================================================

    /// Return the cached summary listing if it has not expired.
    pub fn get_all_recipes(&self) -> Option<Arc<Vec<RecipeSummary>>> {
        let now = self.clock.now();
        let mut slot = rw_write(&self.all_recipes, SOURCE, "get_all_recipes");

        let cached = slot
            .as_ref()
            .filter(|entry| entry.is_fresh(now, self.config.ttl))
            .map(|entry| Arc::clone(&entry.value));

        if cached.is_some() {
            counter!("mealie_cache_listing_hit_total").increment(1);
        } else {
            *slot = None;
            counter!("mealie_cache_listing_miss_total").increment(1);
        }
        cached
    }

    pub fn set_all_recipes(&self, recipes: Vec<RecipeSummary>) -> Arc<Vec<RecipeSummary>> {
        let recipes = Arc::new(recipes);
        *rw_write(&self.all_recipes, SOURCE, "set_all_recipes") =
            Some(CacheEntry::new(Arc::clone(&recipes), self.clock.now()));
        recipes
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let all_recipes_cached = rw_read(&self.all_recipes, SOURCE, "stats.all_recipes")
            .as_ref()
            .is_some_and(|entry| entry.is_fresh(now, self.config.ttl));

        CacheStats {
            cached_recipes: self.len(),
            max_size: self.config.max_recipes_non_zero().get(),
            ttl: self.config.ttl,
            all_recipes_cached,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::super::clock::ManualClock;
    use super::*;

    fn recipe(slug: &str) -> RecipeDocument {
        RecipeDocument {
            slug: slug.to_string(),
            name: format!("Recipe {slug}"),
            ..Default::default()
        }
    }

    fn summary(slug: &str) -> RecipeSummary {
        RecipeSummary {
            slug: slug.to_string(),
            name: format!("Recipe {slug}"),
            ..Default::default()
        }
    }

    fn cache_with(max_recipes: usize, ttl_secs: u64) -> (RecipeCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = CacheConfig {
            max_recipes,
            ttl: Duration::from_secs(ttl_secs),
            ..Default::default()
        };
        (RecipeCache::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn recipe_roundtrip() {
        let (cache, _) = cache_with(10, 300);

        assert!(cache.get("soup").is_none());
        cache.set("soup", recipe("soup"));

        let cached = cache.get("soup").expect("cached recipe");
        assert_eq!(cached.name, "Recipe soup");
    }

    #[test]
    fn entry_expires_at_ttl_boundary() {
        let (cache, clock) = cache_with(10, 300);
        cache.set("soup", recipe("soup"));

        clock.advance(Duration::from_secs(299));
        assert!(cache.get("soup").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("soup").is_none());
        assert_eq!(cache.len(), 0, "expired entry is purged on read");
    }

    #[test]
    fn overwrite_refreshes_timestamp() {
        let (cache, clock) = cache_with(10, 300);
        cache.set("soup", recipe("soup"));

        clock.advance(Duration::from_secs(200));
        cache.set("soup", recipe("soup"));

        clock.advance(Duration::from_secs(200));
        assert!(cache.get("soup").is_some());
    }

    #[test]
    fn capacity_evicts_oldest_write() {
        let (cache, clock) = cache_with(2, 300);

        cache.set("a", recipe("a"));
        clock.advance(Duration::from_secs(1));
        cache.set("b", recipe("b"));
        clock.advance(Duration::from_secs(1));
        cache.set("c", recipe("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn reads_do_not_protect_entries_from_eviction() {
        let (cache, _) = cache_with(2, 300);

        cache.set("a", recipe("a"));
        cache.set("b", recipe("b"));
        // Reading "a" must not make "b" the eviction victim.
        assert!(cache.get("a").is_some());
        cache.set("c", recipe("c"));

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn overwrite_at_capacity_does_not_evict() {
        let (cache, _) = cache_with(2, 300);

        cache.set("a", recipe("a"));
        cache.set("b", recipe("b"));
        cache.set("a", recipe("a"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());

        // "a" was rewritten last, so "b" is now the oldest write.
        cache.set("c", recipe("c"));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn invalidate_one_leaves_listing_and_other_keys() {
        let (cache, _) = cache_with(10, 300);
        cache.set("a", recipe("a"));
        cache.set("b", recipe("b"));
        cache.set_all_recipes(vec![summary("a"), summary("b")]);

        cache.invalidate(Some("a"));

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert_eq!(cache.get_all_recipes().expect("listing").len(), 2);
    }

    #[test]
    fn invalidate_all_clears_listing() {
        let (cache, _) = cache_with(10, 300);
        cache.set("a", recipe("a"));
        cache.set_all_recipes(vec![summary("a")]);

        cache.invalidate(None);

        assert!(cache.is_empty());
        assert!(cache.get_all_recipes().is_none());
        assert!(!cache.stats().all_recipes_cached);
    }

    #[test]
    fn listing_expires_and_is_not_subject_to_capacity() {
        let (cache, clock) = cache_with(1, 60);
        let listing: Vec<_> = (0..5).map(|i| summary(&format!("r{i}"))).collect();
        cache.set_all_recipes(listing);

        assert_eq!(cache.get_all_recipes().expect("listing").len(), 5);

        clock.advance(Duration::from_secs(60));
        assert!(cache.get_all_recipes().is_none());
    }

    #[test]
    fn empty_listing_is_a_cache_hit() {
        let (cache, _) = cache_with(10, 300);
        cache.set_all_recipes(Vec::new());

        let listing = cache.get_all_recipes().expect("empty listing is cached");
        assert!(listing.is_empty());
    }

    #[test]
    fn stats_reports_limits_without_side_effects() {
        let (cache, clock) = cache_with(3, 30);
        cache.set("a", recipe("a"));
        cache.set_all_recipes(vec![summary("a")]);

        let stats = cache.stats();
        assert_eq!(
            stats,
            CacheStats {
                cached_recipes: 1,
                max_size: 3,
                ttl: Duration::from_secs(30),
                all_recipes_cached: true,
            }
        );

        clock.advance(Duration::from_secs(31));
        let stats = cache.stats();
        assert_eq!(stats.cached_recipes, 1, "stats never purges");
        assert!(!stats.all_recipes_cached);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let (cache, _) = cache_with(10, 300);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache
                .recipes
                .write()
                .expect("recipes lock should be acquired");
            panic!("poison recipes lock");
        }));

        cache.set("soup", recipe("soup"));
        assert!(cache.get("soup").is_some());
    }
}
