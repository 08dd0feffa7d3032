use std::collections::HashSet;

use mealie_api_types::RecipeDocument;
use tracing::{debug, info};

use crate::application::recipes::{RecipeService, RecipeSource};

use super::normalize::normalize;
use super::query::{SearchConstraints, parse_query};

/// Expansion stops once this many candidates per requested result exist.
const CANDIDATE_HEADROOM: usize = 2;
const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// One verified search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub slug: String,
    pub name: String,
    /// First 100 characters of the description.
    pub description: String,
    pub total_time: Option<String>,
}

impl MatchResult {
    fn from_document(slug: &str, document: &RecipeDocument) -> Self {
        Self {
            slug: slug.to_string(),
            name: document.name.clone(),
            description: document
                .description
                .chars()
                .take(DESCRIPTION_PREVIEW_CHARS)
                .collect(),
            total_time: document.total_time.clone(),
        }
    }
}

/// Answer `query` with at most `limit` recipes, fetching as few full
/// documents as possible.
///
/// 1. Cheap pass: a summary is a candidate when any token occurs in its
///    lower-cased name or description.
/// 2. Expansion: only when the cheap pass found fewer than `limit`
///    candidates. Remaining recipes are fetched and matched on their full
///    normalized text until `2 * limit` candidates exist.
/// 3. Verification: each candidate is fetched, re-matched on its full text
///    and checked against the time bound, until `limit` results are kept.
///
/// The expansion pass never runs once the cheap pass has filled the quota, so
/// a recipe matching only on tags, ingredients or instructions can be missed
/// when enough name matches exist, even if those matches are later rejected
/// by the time bound.
///
/// Documents that fail to load are skipped. Results keep candidate order.
pub async fn search<S: RecipeSource>(
    recipes: &RecipeService<S>,
    query: &str,
    limit: usize,
) -> Vec<MatchResult> {
    if limit == 0 {
        return Vec::new();
    }

    let constraints = parse_query(query);
    let summaries = recipes.all_summaries().await;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for summary in summaries.iter().filter(|summary| !summary.slug.is_empty()) {
        let matched = constraints.matches(&summary.name.to_lowercase())
            || constraints.matches(&summary.description.to_lowercase());
        if matched && seen.insert(summary.slug.as_str()) {
            candidates.push(summary.slug.as_str());
        }
    }
    debug!(query, candidates = candidates.len(), "Summary pass complete");

    if candidates.len() < limit && !constraints.tokens.is_empty() {
        info!(query, "Expanding search to full recipe details");
        let headroom = limit.saturating_mul(CANDIDATE_HEADROOM);
        for summary in summaries.iter().filter(|summary| !summary.slug.is_empty()) {
            let slug = summary.slug.as_str();
            if seen.contains(slug) {
                continue;
            }
            let Some(document) = recipes.recipe(slug).await else {
                continue;
            };
            if constraints.matches(&normalize(&document)) {
                seen.insert(slug);
                candidates.push(slug);
                if candidates.len() >= headroom {
                    break;
                }
            }
        }
    }

    verify(recipes, &constraints, &candidates, limit).await
}

async fn verify<S: RecipeSource>(
    recipes: &RecipeService<S>,
    constraints: &SearchConstraints,
    candidates: &[&str],
    limit: usize,
) -> Vec<MatchResult> {
    let mut matched = Vec::new();
    for slug in candidates {
        let Some(document) = recipes.recipe(slug).await else {
            continue;
        };
        if !constraints.matches(&normalize(&document)) {
            continue;
        }
        if !constraints.allows_total_time(document.total_time.as_deref()) {
            debug!(slug, total_time = ?document.total_time, "Rejected by time bound");
            continue;
        }

        matched.push(MatchResult::from_document(slug, &document));
        if matched.len() >= limit {
            break;
        }
    }
    matched
}
