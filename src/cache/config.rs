//! Cache configuration.
//!
//! Controls the recipe cache and the group-slug cache via `[cache]` in the
//! configuration file or the `--cache-*` flags.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{
    CacheSettings, DEFAULT_CACHE_MAX_RECIPES, DEFAULT_CACHE_TTL_SECS, DEFAULT_GROUP_SLUG_TTL_SECS,
};

/// Runtime limits for the recipe and group-slug caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum full recipe documents held at once.
    pub max_recipes: usize,
    /// Lifetime of a recipe document or the summary listing.
    pub ttl: Duration,
    /// Lifetime of a resolved group slug.
    pub group_slug_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_recipes: DEFAULT_CACHE_MAX_RECIPES,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            group_slug_ttl: Duration::from_secs(DEFAULT_GROUP_SLUG_TTL_SECS),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            max_recipes: settings.max_recipes.get(),
            ttl: settings.ttl,
            group_slug_ttl: settings.group_slug_ttl,
        }
    }
}

impl CacheConfig {
    /// Returns the recipe limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_recipes_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_recipes).unwrap_or(NonZeroUsize::MIN)
    }
}
