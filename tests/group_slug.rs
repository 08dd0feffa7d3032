use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use mealie_search::application::recipes::RecipeService;
use mealie_search::application::tools::RecipeTools;
use mealie_search::cache::{CacheConfig, GroupSlugResolver, RecipeCache};
use mealie_search::config::Credentials;
use mealie_search::infra::http::{ApiClient, RetryPolicy};
use reqwest::Url;
use serde_json::json;

fn build_tools(server: &MockServer) -> RecipeTools<ApiClient, ApiClient> {
    let client = ApiClient::new(
        Url::parse(&server.base_url()).expect("mock server url"),
        "test-key".to_string(),
        Duration::from_secs(5),
        RetryPolicy::new(0, Duration::ZERO),
    )
    .expect("client should build");

    let recipes = RecipeService::new(
        client.clone(),
        Arc::new(RecipeCache::new(CacheConfig::default())),
        NonZeroU32::new(100).expect("non-zero page size"),
    );
    let credentials = Credentials {
        username: "cook".to_string(),
        password: "secret".to_string(),
    };
    let group_slug =
        GroupSlugResolver::new(client.clone(), Some(credentials), Duration::from_secs(3600));
    RecipeTools::new(recipes, group_slug, client.base_url())
}

#[tokio::test]
async fn resolved_group_is_used_in_links_and_cached() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/api/auth/token");
        then.status(200)
            .json_body(json!({ "access_token": "session", "token_type": "bearer" }));
    });
    let user = server.mock(|when, then| {
        when.method(GET)
            .path("/api/users/self")
            .header("authorization", "Bearer session");
        then.status(200).json_body(json!({ "groupSlug": "family" }));
    });

    let tools = build_tools(&server);
    let base = server.base_url();

    assert_eq!(
        tools.build_recipe_url("pie").await,
        format!("{base}/g/family/r/pie")
    );
    assert_eq!(
        tools.build_recipe_url("cake").await,
        format!("{base}/g/family/r/cake")
    );
    token.assert_calls(1);
    user.assert_calls(1);
}

#[tokio::test]
async fn auth_failure_is_not_retried_until_cache_clear() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/api/auth/token");
        then.status(401).body(r#"{"detail":"Unauthorized"}"#);
    });

    let tools = build_tools(&server);
    let base = server.base_url();

    for _ in 0..3 {
        assert_eq!(
            tools.build_recipe_url("pie").await,
            format!("{base}/g/home/r/pie")
        );
    }
    token.assert_calls(1);

    tools.clear_cache().await;
    assert_eq!(
        tools.build_recipe_url("pie").await,
        format!("{base}/g/home/r/pie")
    );
    token.assert_calls(2);
}

#[tokio::test]
async fn missing_group_falls_back_to_default() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/auth/token");
        then.status(200).json_body(json!({ "access_token": "session" }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/users/self");
        then.status(200).json_body(json!({ "groupSlug": null }));
    });

    let tools = build_tools(&server);
    assert_eq!(tools.group_slug().await, "home");
}
