//! Text-producing recipe operations.
//!
//! Every operation returns human-readable text. Upstream failures are rendered
//! into that text instead of being returned as errors.

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::application::editing::{EditError, RecipeUpdate, RecipeWriteSource};
use crate::application::recipes::{RecipeService, RecipeSource};
use crate::application::search::{self, MatchResult};
use crate::cache::{CacheStats, GroupSlugResolver, GroupSlugSource};
use crate::infra::http::ApiError;

pub const DEFAULT_SEARCH_LIMIT: usize = 15;
pub const DEFAULT_LIST_LIMIT: u32 = 20;

const HEALTH_TITLE: &str = "Mealie Search Health Check";

/// One request in the `serve` loop: `{"tool": "...", "args": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_search_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SlugArgs {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default = "default_list_limit")]
    limit: u32,
    #[serde(default = "default_page")]
    page: u32,
}

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    slug: String,
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    slug: String,
    #[serde(flatten)]
    changes: RecipeUpdate,
}

#[derive(Debug, Deserialize)]
struct TagArgs {
    slug: String,
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImportArgs {
    url: String,
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

fn default_page() -> u32 {
    1
}

pub struct RecipeTools<R, G> {
    recipes: RecipeService<R>,
    group_slug: GroupSlugResolver<G>,
    base_url: String,
}

impl<R, G> RecipeTools<R, G>
where
    R: RecipeSource + RecipeWriteSource,
    G: GroupSlugSource,
{
    pub fn new(
        recipes: RecipeService<R>,
        group_slug: GroupSlugResolver<G>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            recipes,
            group_slug,
            base_url,
        }
    }

    pub fn recipes(&self) -> &RecipeService<R> {
        &self.recipes
    }

    /// Run the tool named in `request`.
    pub async fn call(&self, request: ToolRequest) -> String {
        let ToolRequest { tool, args } = request;
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        debug!(tool = %tool, "Dispatching tool call");

        match tool.as_str() {
            "health_check" => self.health_check().await,
            "search_recipes" => match parse_args::<SearchArgs>(&tool, args) {
                Ok(args) => self.search_recipes(&args.query, args.limit).await,
                Err(message) => message,
            },
            "get_recipe" => match parse_args::<SlugArgs>(&tool, args) {
                Ok(args) => self.get_recipe(&args.slug).await,
                Err(message) => message,
            },
            "list_recipes" => match parse_args::<ListArgs>(&tool, args) {
                Ok(args) => self.list_recipes(args.limit, args.page).await,
                Err(message) => message,
            },
            "get_random_recipe" => self.get_random_recipe().await,
            "update_recipe" => match parse_args::<UpdateArgs>(&tool, args) {
                Ok(args) => self.update_recipe(&args.slug, &args.changes).await,
                Err(message) => message,
            },
            "apply_tags" => match parse_args::<TagArgs>(&tool, args) {
                Ok(args) => self.apply_tags(&args.slug, &args.tags).await,
                Err(message) => message,
            },
            "delete_recipe" => match parse_args::<DeleteArgs>(&tool, args) {
                Ok(args) => self.delete_recipe(&args.slug, args.confirm).await,
                Err(message) => message,
            },
            "create_recipe_from_url" => match parse_args::<ImportArgs>(&tool, args) {
                Ok(args) => self.create_recipe_from_url(&args.url).await,
                Err(message) => message,
            },
            "cache_stats" => self.cache_stats(),
            "clear_cache" => self.clear_cache().await,
            other => format!("Unknown tool: {other}"),
        }
    }

    /// Probe the API with the smallest possible listing request.
    pub async fn check_connectivity(&self) -> Result<(), ApiError> {
        self.recipes.source().recipe_page(1, 1).await.map(|_| ())
    }

    /// Group slug used in recipe links; resolves it on first use.
    pub async fn group_slug(&self) -> String {
        self.group_slug.resolve().await
    }

    /// `{base_url}/g/{group}/r/{slug}`.
    pub async fn build_recipe_url(&self, slug: &str) -> String {
        let group = self.group_slug().await;
        format!("{}/g/{group}/r/{slug}", self.base_url)
    }

    pub async fn health_check(&self) -> String {
        let api_status = match self.check_connectivity().await {
            Ok(()) => "connected".to_string(),
            Err(err) => format!("error: {err}"),
        };
        let group = self.group_slug().await;

        format!(
            "{HEALTH_TITLE}\n{underline}\nAPI URL: {base}\nAPI Status: {api_status}\n\
             Group Slug: {group}\n\n{stats}",
            underline = "=".repeat(HEALTH_TITLE.len()),
            base = self.base_url,
            stats = render_stats(&self.recipes.cache().stats()),
        )
    }

    pub async fn search_recipes(&self, query: &str, limit: usize) -> String {
        let matched = search::search(&self.recipes, query, limit).await;
        if matched.is_empty() {
            return format!("No recipes found matching '{query}'");
        }

        let mut output = vec![format!(
            "Found {} recipe(s) matching '{query}':\n",
            matched.len()
        )];
        for result in &matched {
            let url = self.build_recipe_url(&result.slug).await;
            output.extend(render_match(result, &url));
        }
        output.join("\n")
    }

    pub async fn get_recipe(&self, slug: &str) -> String {
        let recipe = match self.recipes.fetch(slug).await {
            Ok(recipe) => recipe,
            Err(err) => return format!("Error getting recipe: {err}"),
        };
        let url = self.build_recipe_url(slug).await;

        let title = if recipe.name.is_empty() {
            "Recipe"
        } else {
            recipe.name.as_str()
        };
        let mut output = vec![format!("# {title}\n")];
        if !recipe.description.is_empty() {
            output.push(format!("{}\n", recipe.description));
        }
        output.push(format!("**Link:** {url}\n"));

        let timings = [
            ("Total Time", &recipe.total_time),
            ("Prep Time", &recipe.prep_time),
            ("Cook Time", &recipe.perform_time),
            ("Yield", &recipe.recipe_yield),
        ];
        for (label, value) in timings {
            if let Some(value) = value {
                output.push(format!("**{label}:** {value}"));
            }
        }

        if !recipe.recipe_ingredient.is_empty() {
            output.push("\n## Ingredients".to_string());
            for ingredient in &recipe.recipe_ingredient {
                let line = if ingredient.note.is_empty() {
                    &ingredient.display
                } else {
                    &ingredient.note
                };
                if !line.is_empty() {
                    output.push(format!("- {line}"));
                }
            }
        }

        if !recipe.recipe_instructions.is_empty() {
            output.push("\n## Instructions".to_string());
            for (index, step) in recipe.recipe_instructions.iter().enumerate() {
                if !step.text.is_empty() {
                    output.push(format!("{}. {}", index + 1, step.text));
                }
            }
        }

        if !recipe.notes.is_empty() {
            output.push("\n## Notes".to_string());
            for note in recipe.notes.iter().filter(|note| !note.text.is_empty()) {
                output.push(format!("- {}", note.text));
            }
        }

        if !recipe.tags.is_empty() {
            let tags: Vec<&str> = recipe.tags.iter().map(|tag| tag.name.as_str()).collect();
            output.push(format!("\n**Tags:** {}", tags.join(", ")));
        }

        if !recipe.org_url.is_empty() {
            output.push(format!("**Source:** {}", recipe.org_url));
        }

        output.join("\n")
    }

    /// One page of the listing, straight from the API.
    pub async fn list_recipes(&self, limit: u32, page: u32) -> String {
        let limit = limit.max(1);
        let page = page.max(1);
        let result = match self.recipes.source().recipe_page(page, limit).await {
            Ok(result) => result,
            Err(err) => return format!("Error listing recipes: {err}"),
        };
        if result.items.is_empty() {
            return "No recipes found.".to_string();
        }

        let total = result.total.unwrap_or(result.items.len() as u64);
        let mut output = vec![format!(
            "# Recipes (page {page}, showing {} of {total})\n",
            result.items.len()
        )];
        for summary in &result.items {
            let name = if summary.name.is_empty() {
                "Untitled"
            } else {
                summary.name.as_str()
            };
            output.push(format!("- **{name}**"));
            if !summary.tags.is_empty() {
                let tags: Vec<&str> = summary.tags.iter().map(|tag| tag.name.as_str()).collect();
                output.push(format!("  Tags: {}", tags.join(", ")));
            }
            output.push(format!("  {}\n", self.build_recipe_url(&summary.slug).await));
        }

        if total > u64::from(page) * u64::from(limit) {
            output.push(format!("\n*Use page={} to see more*", page + 1));
        }
        output.join("\n")
    }

    pub async fn get_random_recipe(&self) -> String {
        let summaries = self.recipes.all_summaries().await;
        let slug = {
            let candidates: Vec<&str> = summaries
                .iter()
                .map(|summary| summary.slug.as_str())
                .filter(|slug| !slug.is_empty())
                .collect();
            candidates
                .choose(&mut rand::thread_rng())
                .map(|slug| slug.to_string())
        };

        match slug {
            Some(slug) => {
                debug!(slug = %slug, "Picked random recipe");
                self.get_recipe(&slug).await
            }
            None => "No recipes found.".to_string(),
        }
    }

    pub async fn update_recipe(&self, slug: &str, changes: &RecipeUpdate) -> String {
        match self.recipes.update_recipe(slug, changes).await {
            Ok(updated) => format!(
                "Recipe updated: **{}**\n\nChanges: {}\n\nURL: {}",
                updated.name,
                updated.changes.join(", "),
                self.build_recipe_url(slug).await
            ),
            Err(EditError::NoChanges) => {
                "No changes provided. Specify at least one field to update.".to_string()
            }
            Err(EditError::Read(err)) => format!("Error fetching recipe: {err}"),
            Err(EditError::Write(err)) => format!("Error updating recipe: {err}"),
        }
    }

    pub async fn apply_tags(&self, slug: &str, tags: &[String]) -> String {
        let applied = match self.recipes.apply_tags(slug, tags).await {
            Ok(applied) => applied,
            Err(EditError::NoChanges) => return "No tags provided.".to_string(),
            Err(EditError::Read(err)) => return format!("Error getting recipe: {err}"),
            Err(EditError::Write(err)) => return format!("Error updating recipe: {err}"),
        };

        let mut output = vec![format!("Tags updated for: {}\n", applied.name)];
        if !applied.created.is_empty() {
            output.push(format!("Created new tags: {}", applied.created.join(", ")));
        }
        output.push(format!("Applied: {}", applied.applied.join(", ")));
        output.push(format!("\nURL: {}", self.build_recipe_url(slug).await));
        output.join("\n")
    }

    /// Deletes only when `confirm` is set; otherwise explains how to.
    pub async fn delete_recipe(&self, slug: &str, confirm: bool) -> String {
        if !confirm {
            return format!("To delete recipe '{slug}', call again with confirm=true");
        }
        match self.recipes.delete_recipe(slug).await {
            Ok(()) => format!("Recipe '{slug}' deleted successfully."),
            Err(err) => format!("Error deleting recipe: {err}"),
        }
    }

    pub async fn create_recipe_from_url(&self, url: &str) -> String {
        info!(url, "Importing recipe");
        match self.recipes.import_recipe(url).await {
            Ok(slug) => format!(
                "Recipe imported successfully!\n\nURL: {}",
                self.build_recipe_url(&slug).await
            ),
            Err(err) => format!("Error importing recipe: {err}"),
        }
    }

    pub fn cache_stats(&self) -> String {
        render_stats(&self.recipes.cache().stats())
    }

    /// Drop every cached document, the listing and the group slug, including
    /// a recorded authentication failure.
    pub async fn clear_cache(&self) -> String {
        self.recipes.cache().invalidate(None);
        self.group_slug.reset().await;
        info!("All caches cleared");
        "All caches cleared. Next requests will fetch fresh data.".to_string()
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|err| format!("Invalid arguments for {tool}: {err}"))
}

fn render_match(result: &MatchResult, url: &str) -> Vec<String> {
    let mut lines = vec![format!("- **{}**", result.name)];
    if !result.description.is_empty() {
        lines.push(format!("  {}...", result.description));
    }
    if let Some(total_time) = &result.total_time {
        lines.push(format!("  Time: {total_time}"));
    }
    lines.push(format!("  Link: {url}\n"));
    lines
}

fn render_stats(stats: &CacheStats) -> String {
    format!(
        "Cache Statistics:\n- Cached recipes: {}/{}\n- TTL: {}s\n- Full list cached: {}\n",
        stats.cached_recipes,
        stats.max_size,
        stats.ttl.as_secs(),
        if stats.all_recipes_cached { "yes" } else { "no" },
    )
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use mealie_api_types::{Ingredient, NamedRef, RecipeDocument, TextBlock};
    use serde_json::json;

    use crate::application::recipes::testing::{FakeSource, recipe};
    use crate::cache::{CacheConfig, RecipeCache};
    use crate::config::Credentials;

    use super::*;

    #[derive(Clone, Default)]
    struct FixedGroup {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GroupSlugSource for FixedGroup {
        async fn fetch_group_slug(&self, _credentials: &Credentials) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("family".to_string())
        }
    }

    fn build_tools(
        recipes: Vec<RecipeDocument>,
    ) -> (RecipeTools<FakeSource, FixedGroup>, FixedGroup) {
        let group = FixedGroup::default();
        let service = RecipeService::new(
            FakeSource::with_recipes(recipes),
            Arc::new(RecipeCache::new(CacheConfig::default())),
            NonZeroU32::new(100).expect("non-zero page size"),
        );
        let resolver = GroupSlugResolver::new(
            group.clone(),
            Some(Credentials {
                username: "cook".into(),
                password: "pw".into(),
            }),
            Duration::from_secs(3600),
        );
        (
            RecipeTools::new(service, resolver, "https://mealie.test/"),
            group,
        )
    }

    fn soup() -> RecipeDocument {
        RecipeDocument {
            description: "Smooth and bright".into(),
            org_url: "https://example.org/soup".into(),
            total_time: Some("PT40M".into()),
            recipe_yield: Some("4 servings".into()),
            tags: vec![
                NamedRef {
                    name: "Vegan".into(),
                },
                NamedRef {
                    name: "Winter".into(),
                },
            ],
            recipe_ingredient: vec![
                Ingredient {
                    display: "2 carrots".into(),
                    ..Ingredient::default()
                },
                Ingredient {
                    note: "to taste".into(),
                    display: "salt".into(),
                    ..Ingredient::default()
                },
            ],
            recipe_instructions: vec![
                TextBlock {
                    text: "Chop".into(),
                },
                TextBlock { text: String::new() },
                TextBlock {
                    text: "Simmer".into(),
                },
            ],
            notes: vec![TextBlock {
                text: "Freezes well".into(),
            }],
            ..recipe("carrot-soup", "Carrot Soup")
        }
    }

    #[tokio::test]
    async fn recipe_url_uses_resolved_group() {
        let (tools, group) = build_tools(Vec::new());

        assert_eq!(
            tools.build_recipe_url("carrot-soup").await,
            "https://mealie.test/g/family/r/carrot-soup"
        );
        tools.build_recipe_url("other").await;
        assert_eq!(group.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_renders_matches() {
        let (tools, _) = build_tools(vec![soup(), recipe("bread", "Bread")]);

        let text = tools.search_recipes("carrot", 15).await;
        assert_eq!(
            text,
            "Found 1 recipe(s) matching 'carrot':\n\n\
             - **Carrot Soup**\n  Smooth and bright...\n  Time: PT40M\n  \
             Link: https://mealie.test/g/family/r/carrot-soup\n"
        );
    }

    #[tokio::test]
    async fn search_reports_no_matches() {
        let (tools, _) = build_tools(vec![soup()]);

        assert_eq!(
            tools.search_recipes("durian", 15).await,
            "No recipes found matching 'durian'"
        );
    }

    #[tokio::test]
    async fn recipe_is_rendered_as_markdown() {
        let (tools, _) = build_tools(vec![soup()]);

        let text = tools.get_recipe("carrot-soup").await;
        let expected = [
            "# Carrot Soup\n",
            "Smooth and bright\n",
            "**Link:** https://mealie.test/g/family/r/carrot-soup\n",
            "**Total Time:** PT40M",
            "**Yield:** 4 servings",
            "\n## Ingredients",
            "- 2 carrots",
            "- to taste",
            "\n## Instructions",
            "1. Chop",
            "3. Simmer",
            "\n## Notes",
            "- Freezes well",
            "\n**Tags:** Vegan, Winter",
            "**Source:** https://example.org/soup",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn missing_recipe_reports_error_text() {
        let (tools, _) = build_tools(Vec::new());

        let text = tools.get_recipe("ghost").await;
        assert!(text.starts_with("Error getting recipe: "), "{text}");
    }

    #[tokio::test]
    async fn listing_hints_at_next_page() {
        let docs = (0..3)
            .map(|i| recipe(&format!("r{i}"), &format!("Recipe {i}")))
            .collect();
        let (tools, _) = build_tools(docs);

        let first = tools.list_recipes(2, 1).await;
        assert!(first.starts_with("# Recipes (page 1, showing 2 of 3)\n"));
        assert!(first.contains("- **Recipe 0**"));
        assert!(first.contains("https://mealie.test/g/family/r/r1"));
        assert!(first.ends_with("*Use page=2 to see more*"));

        let last = tools.list_recipes(2, 2).await;
        assert!(!last.contains("Use page="));
        assert_eq!(tools.list_recipes(2, 3).await, "No recipes found.");
    }

    #[tokio::test]
    async fn random_recipe_comes_from_listing() {
        let (tools, _) = build_tools(vec![soup()]);
        assert!(tools.get_random_recipe().await.starts_with("# Carrot Soup"));

        let (empty, _) = build_tools(Vec::new());
        assert_eq!(empty.get_random_recipe().await, "No recipes found.");
    }

    #[tokio::test]
    async fn clear_cache_drops_documents_and_group_slug() {
        let (tools, group) = build_tools(vec![soup()]);
        tools.get_recipe("carrot-soup").await;
        assert_eq!(tools.recipes().cache().len(), 1);

        let text = tools.clear_cache().await;
        assert_eq!(text, "All caches cleared. Next requests will fetch fresh data.");
        assert!(tools.recipes().cache().is_empty());

        tools.group_slug().await;
        assert_eq!(group.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn health_check_reports_status_and_stats() {
        let (tools, _) = build_tools(vec![soup()]);

        let text = tools.health_check().await;
        let heading = format!("Mealie Search Health Check\n{}\n", "=".repeat(26));
        assert!(text.starts_with(&heading));
        assert!(text.contains("API URL: https://mealie.test\n"));
        assert!(text.contains("API Status: connected\n"));
        assert!(text.contains("Group Slug: family\n"));
        assert!(text.contains("- Cached recipes: 0/500\n- TTL: 300s\n- Full list cached: no\n"));
    }

    #[tokio::test]
    async fn call_dispatches_by_tool_name() {
        let (tools, _) = build_tools(vec![soup()]);

        let request: ToolRequest = serde_json::from_value(json!({
            "tool": "search_recipes",
            "args": { "query": "soup" }
        }))
        .expect("valid request");
        assert!(tools.call(request).await.starts_with("Found 1 recipe(s)"));

        let request: ToolRequest =
            serde_json::from_value(json!({ "tool": "cache_stats" })).expect("valid request");
        assert!(tools.call(request).await.starts_with("Cache Statistics:"));
    }

    #[tokio::test]
    async fn call_reports_bad_requests_as_text() {
        let (tools, _) = build_tools(Vec::new());

        let unknown = ToolRequest {
            tool: "delete_everything".into(),
            args: Value::Null,
        };
        assert_eq!(tools.call(unknown).await, "Unknown tool: delete_everything");

        let missing = ToolRequest {
            tool: "get_recipe".into(),
            args: json!({}),
        };
        assert!(
            tools
                .call(missing)
                .await
                .starts_with("Invalid arguments for get_recipe: ")
        );
    }

    #[tokio::test]
    async fn get_recipe_after_update_shows_fresh_document() {
        let (tools, _) = build_tools(vec![soup()]);
        assert!(tools.get_recipe("carrot-soup").await.starts_with("# Carrot Soup\n"));

        let changes = RecipeUpdate {
            name: Some("Carrot Ginger Soup".into()),
            total_time: Some("PT50M".into()),
            ..RecipeUpdate::default()
        };
        let text = tools.update_recipe("carrot-soup", &changes).await;
        assert_eq!(
            text,
            "Recipe updated: **Carrot Ginger Soup**\n\nChanges: name, total time\n\n\
             URL: https://mealie.test/g/family/r/carrot-soup"
        );

        let text = tools.get_recipe("carrot-soup").await;
        assert!(text.starts_with("# Carrot Ginger Soup\n"), "{text}");
        assert!(text.contains("**Total Time:** PT50M"));
        assert_eq!(tools.recipes().source().fetched().len(), 2);
    }

    #[tokio::test]
    async fn update_without_fields_is_refused() {
        let (tools, _) = build_tools(vec![soup()]);

        let text = tools
            .update_recipe("carrot-soup", &RecipeUpdate::default())
            .await;
        assert_eq!(text, "No changes provided. Specify at least one field to update.");
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let (tools, _) = build_tools(vec![soup()]);
        tools.get_recipe("carrot-soup").await;

        let text = tools.delete_recipe("carrot-soup", false).await;
        assert_eq!(text, "To delete recipe 'carrot-soup', call again with confirm=true");
        assert!(tools.recipes().source().writes().is_empty());
        assert_eq!(tools.recipes().cache().len(), 1);

        let text = tools.delete_recipe("carrot-soup", true).await;
        assert_eq!(text, "Recipe 'carrot-soup' deleted successfully.");
        assert!(tools.recipes().cache().is_empty());
        assert!(
            tools
                .get_recipe("carrot-soup")
                .await
                .starts_with("Error getting recipe: ")
        );
    }

    #[tokio::test]
    async fn applied_tags_are_reported_and_visible_on_next_read() {
        let (tools, _) = build_tools(vec![recipe("stew", "Stew")]);
        tools.get_recipe("stew").await;

        let text = tools.apply_tags("stew", &["Winter".to_string()]).await;
        assert_eq!(
            text,
            "Tags updated for: Stew\n\nCreated new tags: Winter\nApplied: Winter\n\n\
             URL: https://mealie.test/g/family/r/stew"
        );
        assert!(tools.get_recipe("stew").await.ends_with("**Tags:** Winter"));
        assert_eq!(tools.apply_tags("stew", &[]).await, "No tags provided.");
    }

    #[tokio::test]
    async fn import_links_to_new_recipe() {
        let (tools, _) = build_tools(vec![soup()]);
        tools.get_random_recipe().await;

        let text = tools
            .create_recipe_from_url("https://example.org/recipes/pho")
            .await;
        assert_eq!(
            text,
            "Recipe imported successfully!\n\nURL: https://mealie.test/g/family/r/pho"
        );
        assert!(!tools.recipes().cache().stats().all_recipes_cached);
    }

    #[tokio::test]
    async fn call_dispatches_write_tools() {
        let (tools, _) = build_tools(vec![soup()]);

        let request: ToolRequest = serde_json::from_value(json!({
            "tool": "update_recipe",
            "args": { "slug": "carrot-soup", "servings": "6 bowls" }
        }))
        .expect("valid request");
        assert!(tools.call(request).await.contains("Changes: servings"));

        let request: ToolRequest = serde_json::from_value(json!({
            "tool": "delete_recipe",
            "args": { "slug": "carrot-soup", "confirm": true }
        }))
        .expect("valid request");
        assert_eq!(
            tools.call(request).await,
            "Recipe 'carrot-soup' deleted successfully."
        );
        assert_eq!(
            tools.recipes().source().writes(),
            vec!["PUT carrot-soup", "DELETE carrot-soup"]
        );
    }
}
