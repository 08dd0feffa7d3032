//! Process-lifetime caches for recipe data.
//!
//! - [`RecipeCache`]: recipe documents (TTL and capacity bounded) plus the
//!   full summary listing (TTL bounded).
//! - [`GroupSlugResolver`]: the user's group slug, with failure suppression.
//!
//! Nothing here is persisted. All state starts empty and is only reset by an
//! explicit clear.

mod clock;
mod config;
mod group_slug;
mod lock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use group_slug::{FALLBACK_GROUP_SLUG, GroupSlugResolver, GroupSlugSource};
pub use store::{CacheEntry, CacheStats, RecipeCache};
