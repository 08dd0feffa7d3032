//! Wire types for the Mealie recipe API.
//!
//! Only the fields read by search and rendering are modelled. Upstream
//! documents are not guaranteed to be complete, so every field carries a
//! default: missing or `null` strings become `""`, missing or `null`
//! sequences become empty, and optional display fields become `None`.
//! Numeric values in string slots are accepted and rendered as text.
//!
//! A field of the wrong shape falls back to the same default instead of
//! failing the whole document. Sequence elements that do not decode are
//! dropped.

use serde::{Deserialize, Serialize};

/// A `{ "name": ... }` organiser reference (tag, category, tool, food).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRef {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
}

/// A `{ "text": ... }` block (note, instruction step).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    #[serde(deserialize_with = "lenient::string")]
    pub text: String,
}

/// Partial recipe record returned by the listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecipeSummary {
    #[serde(deserialize_with = "lenient::string")]
    pub slug: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::seq")]
    pub tags: Vec<NamedRef>,
}

/// One page of `GET /api/recipes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecipePage {
    #[serde(deserialize_with = "lenient::seq")]
    pub items: Vec<RecipeSummary>,
    #[serde(deserialize_with = "lenient::count")]
    pub total: Option<u64>,
}

/// Ingredient line of a full recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ingredient {
    #[serde(deserialize_with = "lenient::string")]
    pub note: String,
    #[serde(deserialize_with = "lenient::string")]
    pub display: String,
    #[serde(deserialize_with = "lenient::string")]
    pub original_text: String,
    #[serde(deserialize_with = "lenient::object")]
    pub food: Option<NamedRef>,
}

/// Full recipe document returned by `GET /api/recipes/{slug}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecipeDocument {
    #[serde(deserialize_with = "lenient::string")]
    pub slug: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(rename = "orgURL", deserialize_with = "lenient::string")]
    pub org_url: String,
    #[serde(deserialize_with = "lenient::seq")]
    pub notes: Vec<TextBlock>,
    #[serde(deserialize_with = "lenient::seq")]
    pub tools: Vec<NamedRef>,
    #[serde(deserialize_with = "lenient::seq")]
    pub tags: Vec<NamedRef>,
    #[serde(deserialize_with = "lenient::seq")]
    pub recipe_category: Vec<NamedRef>,
    #[serde(deserialize_with = "lenient::seq")]
    pub recipe_ingredient: Vec<Ingredient>,
    #[serde(deserialize_with = "lenient::seq")]
    pub recipe_instructions: Vec<TextBlock>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub total_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub prep_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub perform_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub recipe_yield: Option<String>,
}

/// Tag as served by `/api/organizers/tags` and embedded in recipe documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub slug: String,
}

/// Response of `GET /api/organizers/tags`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagPage {
    #[serde(deserialize_with = "lenient::seq")]
    pub items: Vec<Tag>,
}

/// Response of `POST /api/auth/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Subset of `GET /api/users/self`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub group_slug: Option<String>,
}

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(scalar_text(Value::deserialize(deserializer)?).filter(|text| !text.is_empty()))
    }

    /// Anything but an array is empty; undecodable elements are skipped.
    pub fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let Value::Array(elements) = Value::deserialize(deserializer)? else {
            return Ok(Vec::new());
        };
        Ok(elements
            .into_iter()
            .filter_map(|element| serde_json::from_value(element).ok())
            .collect())
    }

    /// A nested object, or `None` when the value is not one.
    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => Ok(serde_json::from_value(value).ok()),
            _ => Ok(None),
        }
    }

    /// A non-negative integer, given as a number or as numeric text.
    pub fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }
}
