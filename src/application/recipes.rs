//! Cache-or-network access to recipe listings and documents.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use mealie_api_types::{RecipeDocument, RecipePage, RecipeSummary};
use metrics::counter;
use tracing::{debug, error, info};

use crate::cache::RecipeCache;
use crate::infra::http::ApiError;

/// Upstream reads the recipe layer depends on.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// One page of the summary listing. Pages are 1-based.
    async fn recipe_page(&self, page: u32, per_page: u32) -> Result<RecipePage, ApiError>;

    async fn recipe(&self, slug: &str) -> Result<RecipeDocument, ApiError>;
}

pub struct RecipeService<S> {
    source: S,
    cache: Arc<RecipeCache>,
    page_size: NonZeroU32,
}

impl<S: RecipeSource> RecipeService<S> {
    pub fn new(source: S, cache: Arc<RecipeCache>, page_size: NonZeroU32) -> Self {
        Self {
            source,
            cache,
            page_size,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &RecipeCache {
        &self.cache
    }

    /// Every recipe summary, from cache or by walking the paginated listing.
    ///
    /// Pagination stops at an empty or short page. A failed page also stops
    /// it; whatever was collected so far is returned but not cached, so the
    /// next call retries the whole walk.
    pub async fn all_summaries(&self) -> Arc<Vec<RecipeSummary>> {
        if let Some(cached) = self.cache.get_all_recipes() {
            debug!(count = cached.len(), "Returning cached recipe list");
            return cached;
        }

        counter!("mealie_listing_fetch_total").increment(1);
        info!("Fetching all recipes from API");

        let per_page = self.page_size.get();
        let mut summaries = Vec::new();
        let mut page = 1;
        loop {
            let items = match self.source.recipe_page(page, per_page).await {
                Ok(result) => result.items,
                Err(err) => {
                    error!(page, error = %err, "Error fetching recipe page");
                    info!(count = summaries.len(), "Returning partial recipe list");
                    return Arc::new(summaries);
                }
            };

            let fetched = items.len();
            summaries.extend(items);
            if fetched == 0 || fetched < per_page as usize {
                break;
            }
            page += 1;
        }

        info!(count = summaries.len(), "Fetched recipe list");
        self.cache.set_all_recipes(summaries)
    }

    /// Full document for `slug`, from cache or upstream. Successful fetches
    /// are cached.
    pub async fn fetch(&self, slug: &str) -> Result<Arc<RecipeDocument>, ApiError> {
        if let Some(cached) = self.cache.get(slug) {
            return Ok(cached);
        }
        let document = self.source.recipe(slug).await?;
        Ok(self.cache.set(slug, document))
    }

    /// Like [`fetch`](Self::fetch), but a failure is logged and reported as absent.
    pub async fn recipe(&self, slug: &str) -> Option<Arc<RecipeDocument>> {
        match self.fetch(slug).await {
            Ok(document) => Some(document),
            Err(err) => {
                debug!(slug, error = %err, "Recipe unavailable");
                None
            }
        }
    }
}
