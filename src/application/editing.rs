//! Recipe writes.
//!
//! A successful write drops the affected cache entries, so the next read of
//! that recipe goes back upstream. Updates, deletions and tag changes drop
//! only the recipe's own entry; imports add a recipe to the collection and
//! clear everything, listing included.

use std::collections::HashSet;

use async_trait::async_trait;
use mealie_api_types::{Tag, TagPage};
use metrics::counter;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::recipes::{RecipeService, RecipeSource};
use crate::infra::http::ApiError;

/// Upstream writes the editing operations depend on.
///
/// Documents travel as raw JSON so fields this crate does not model survive
/// a read-modify-write cycle.
#[async_trait]
pub trait RecipeWriteSource: Send + Sync {
    /// The document exactly as upstream serves it, bypassing the cache.
    async fn raw_recipe(&self, slug: &str) -> Result<Value, ApiError>;

    /// Replace the whole document (`PUT`).
    async fn replace_recipe(&self, slug: &str, document: &Value) -> Result<Value, ApiError>;

    /// Overwrite the given top-level fields (`PATCH`).
    async fn patch_recipe(&self, slug: &str, patch: &Value) -> Result<Value, ApiError>;

    async fn delete_recipe(&self, slug: &str) -> Result<(), ApiError>;

    /// Have upstream scrape a recipe page. Returns the new recipe's slug.
    async fn import_recipe(&self, url: &str) -> Result<String, ApiError>;

    async fn tags(&self) -> Result<TagPage, ApiError>;

    async fn create_tag(&self, name: &str) -> Result<Tag, ApiError>;
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("nothing to change")]
    NoChanges,
    #[error("failed to read recipe: {0}")]
    Read(#[source] ApiError),
    #[error("failed to write recipe: {0}")]
    Write(#[source] ApiError),
}

/// Field changes for [`RecipeService::update_recipe`].
///
/// `None` leaves a field untouched. An empty time or yield clears it. List
/// fields replace the stored list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub servings: Option<String>,
    pub notes: Option<Vec<String>>,
}

impl RecipeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the changes into a raw document and describe each one.
    fn apply_to(&self, document: &mut Map<String, Value>) -> Vec<String> {
        let mut changes = Vec::new();

        let texts = [
            ("name", &self.name, "name"),
            ("description", &self.description, "description"),
        ];
        for (key, value, label) in texts {
            if let Some(value) = value {
                document.insert(key.to_string(), json!(value));
                changes.push(label.to_string());
            }
        }

        let clearable = [
            ("prepTime", &self.prep_time, "prep time"),
            ("performTime", &self.cook_time, "cook time"),
            ("totalTime", &self.total_time, "total time"),
            ("recipeYield", &self.servings, "servings"),
        ];
        for (key, value, label) in clearable {
            if let Some(value) = value {
                let value = if value.is_empty() {
                    Value::Null
                } else {
                    json!(value)
                };
                document.insert(key.to_string(), value);
                changes.push(label.to_string());
            }
        }

        if let Some(ingredients) = &self.ingredients {
            let lines = ingredients
                .iter()
                .map(|line| {
                    json!({
                        "referenceId": Uuid::new_v4().to_string(),
                        "note": line,
                        "display": line,
                    })
                })
                .collect();
            document.insert("recipeIngredient".to_string(), Value::Array(lines));
            changes.push(format!("ingredients ({} items)", ingredients.len()));
        }
        if let Some(instructions) = &self.instructions {
            document.insert("recipeInstructions".to_string(), text_blocks(instructions));
            changes.push(format!("instructions ({} steps)", instructions.len()));
        }
        if let Some(notes) = &self.notes {
            document.insert("notes".to_string(), text_blocks(notes));
            changes.push(format!("notes ({} items)", notes.len()));
        }

        changes
    }
}

fn text_blocks(texts: &[String]) -> Value {
    texts
        .iter()
        .map(|text| json!({ "id": Uuid::new_v4().to_string(), "text": text }))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeUpdated {
    pub name: String,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsApplied {
    pub name: String,
    /// Requested tags that did not exist and were created.
    pub created: Vec<String>,
    pub applied: Vec<String>,
}

impl<S> RecipeService<S>
where
    S: RecipeSource + RecipeWriteSource,
{
    /// Read the upstream document, apply `update` and store it back.
    pub async fn update_recipe(
        &self,
        slug: &str,
        update: &RecipeUpdate,
    ) -> Result<RecipeUpdated, EditError> {
        if update.is_empty() {
            return Err(EditError::NoChanges);
        }

        let mut document = self.source().raw_recipe(slug).await.map_err(EditError::Read)?;
        let Value::Object(fields) = &mut document else {
            return Err(EditError::Read(ApiError::Decode(
                "recipe document is not an object".to_string(),
            )));
        };
        let changes = update.apply_to(fields);

        let saved = self
            .source()
            .replace_recipe(slug, &document)
            .await
            .map_err(EditError::Write)?;
        self.written(slug, "update");
        // A rename may move the recipe to a new slug.
        if let Some(moved) = saved.get("slug").and_then(Value::as_str) {
            if moved != slug {
                self.cache().invalidate(Some(moved));
            }
        }

        let name = saved
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .or(update.name.as_deref())
            .unwrap_or(slug)
            .to_string();
        Ok(RecipeUpdated { name, changes })
    }

    pub async fn delete_recipe(&self, slug: &str) -> Result<(), ApiError> {
        self.source().delete_recipe(slug).await?;
        self.written(slug, "delete");
        Ok(())
    }

    /// Add `names` to the recipe's tags, creating tags that do not exist yet.
    ///
    /// Tags are merged with the recipe's current ones and deduplicated by id,
    /// or by name for tags without an id. A tag that cannot be created is
    /// skipped.
    pub async fn apply_tags(
        &self,
        slug: &str,
        names: &[String],
    ) -> Result<TagsApplied, EditError> {
        if names.is_empty() {
            return Err(EditError::NoChanges);
        }

        let document = self.source().raw_recipe(slug).await.map_err(EditError::Read)?;
        let existing = match self.source().tags().await {
            Ok(page) => page.items,
            Err(err) => {
                warn!(error = %err, "Could not list tags; treating every tag as new");
                Vec::new()
            }
        };

        let mut additions = Vec::new();
        let mut created = Vec::new();
        for name in names {
            if let Some(tag) = existing.iter().find(|tag| tag.name == *name) {
                additions.push(tag.clone());
                continue;
            }
            match self.source().create_tag(name).await {
                Ok(tag) => {
                    info!(tag = %name, "Created new tag");
                    additions.push(tag);
                    created.push(name.clone());
                }
                Err(err) => warn!(tag = %name, error = %err, "Failed to create tag"),
            }
        }

        let current = document
            .get("tags")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut seen = HashSet::new();
        let merged: Vec<Value> = current
            .into_iter()
            .chain(additions.iter().map(|tag| json!(tag)))
            .filter(|tag| tag_key(tag).is_some_and(|key| seen.insert(key)))
            .collect();

        self.source()
            .patch_recipe(slug, &json!({ "tags": merged }))
            .await
            .map_err(EditError::Write)?;
        self.written(slug, "tags");

        let name = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(TagsApplied {
            name,
            created,
            applied: names.to_vec(),
        })
    }

    /// Import a recipe from a web page. Returns the new slug.
    pub async fn import_recipe(&self, url: &str) -> Result<String, ApiError> {
        let slug = self.source().import_recipe(url).await?;
        self.cache().invalidate(None);
        counter!("mealie_recipe_write_total", "operation" => "import").increment(1);
        info!(slug = %slug, "Imported recipe; caches cleared");
        Ok(slug)
    }

    fn written(&self, slug: &str, operation: &'static str) {
        self.cache().invalidate(Some(slug));
        counter!("mealie_recipe_write_total", "operation" => operation).increment(1);
        info!(slug, operation, "Recipe changed upstream; cached copy dropped");
    }
}

fn tag_key(tag: &Value) -> Option<String> {
    let field = |key: &str| {
        tag.get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    };
    field("id")
        .map(|id| format!("id:{id}"))
        .or_else(|| field("name").map(|name| format!("name:{name}")))
}
