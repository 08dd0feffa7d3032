use std::time::Duration;

use async_trait::async_trait;
use mealie_api_types::{AccessToken, CurrentUser, RecipeDocument, RecipePage, Tag, TagPage};
use metrics::counter;
use reqwest::{Client, Method, Response, Url, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::application::editing::RecipeWriteSource;
use crate::application::recipes::RecipeSource;
use crate::cache::{FALLBACK_GROUP_SLUG, GroupSlugSource};
use crate::config::{ApiSettings, Credentials};

use super::error::ApiError;
use super::retry::RetryPolicy;

/// Authenticated gateway to the Mealie REST API.
///
/// Every call carries the bearer API key. Transient failures are retried per
/// [`RetryPolicy`]; an empty successful body is reported as
/// `{"success": true}`.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    key: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(
        base: Url,
        key: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(ApiError::transport)?;
        Ok(Self {
            client,
            base,
            key,
            retry,
        })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        Self::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.timeout,
            RetryPolicy::new(settings.max_retries, settings.retry_delay),
        )
    }

    pub fn user_agent() -> &'static str {
        concat!("mealie-search/", env!("CARGO_PKG_VERSION"))
    }

    /// Base URL without a trailing slash, for building user-facing links.
    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// `{base}/api{path}` with optional query pairs.
    pub fn url(&self, path: &str, query: Option<&[(&str, String)]>) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}/api{}", self.base_url(), path))?;
        if let Some(q) = query {
            let mut qp = url.query_pairs_mut();
            for (k, v) in q {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Perform an authenticated request with retries.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path, query)?;
        self.execute(method, url, body).await
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        if !matches!(
            method,
            Method::GET | Method::POST | Method::PATCH | Method::PUT | Method::DELETE
        ) {
            return Err(ApiError::UnsupportedMethod(method));
        }

        let mut attempt = 1;
        loop {
            match self.send_once(method.clone(), url.clone(), body).await {
                Ok(value) => return Ok(value),
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    let delay = self.retry.delay_for(&err, attempt);
                    counter!("mealie_api_retry_total").increment(1);
                    warn!(
                        %method,
                        path = url.path(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying Mealie API request"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        %method,
                        path = url.path(),
                        attempt,
                        error = %err,
                        "Mealie API request failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut req = self
            .client
            .request(method, url)
            .bearer_auth(&self.key)
            .header(header::ACCEPT, "application/json");
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(ApiError::transport)?;
        Self::handle(resp).await
    }

    async fn handle(resp: Response) -> Result<Value, ApiError> {
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ApiError::transport)?;
        if !status.is_success() {
            return Err(ApiError::status(status, &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(json!({ "success": true }));
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(&e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let value = self.execute(Method::GET, url, None).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(&e))
    }

    /// One page of the recipe listing.
    pub async fn list_recipes(&self, page: u32, per_page: u32) -> Result<RecipePage, ApiError> {
        let query = [("page", page.to_string()), ("perPage", per_page.to_string())];
        let url = self.url("/recipes", Some(&query))?;
        self.get_json(url).await
    }

    /// `{base}/api/recipes/{slug}` with the slug percent-encoded as one segment.
    fn recipe_url(&self, slug: &str) -> Result<Url, ApiError> {
        let mut url = self.url("/recipes", None)?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(slug);
        Ok(url)
    }

    pub async fn get_recipe(&self, slug: &str) -> Result<RecipeDocument, ApiError> {
        self.get_json(self.recipe_url(slug)?).await
    }

    /// Exchange username/password for a short-lived access token. Not retried.
    pub async fn obtain_token(&self, credentials: &Credentials) -> Result<AccessToken, ApiError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", &credentials.username)
            .append_pair("password", &credentials.password)
            .finish();

        let resp = self
            .client
            .post(self.url("/auth/token", None)?)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(ApiError::transport)?;
        let value = Self::handle(resp).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(&e))
    }

    /// Identity of the user owning `token`. Not retried.
    pub async fn current_user(&self, token: &str) -> Result<CurrentUser, ApiError> {
        let resp = self
            .client
            .get(self.url("/users/self", None)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::transport)?;
        let value = Self::handle(resp).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(&e))
    }
}

#[async_trait]
impl RecipeSource for ApiClient {
    async fn recipe_page(&self, page: u32, per_page: u32) -> Result<RecipePage, ApiError> {
        self.list_recipes(page, per_page).await
    }

    async fn recipe(&self, slug: &str) -> Result<RecipeDocument, ApiError> {
        self.get_recipe(slug).await
    }
}

#[async_trait]
impl RecipeWriteSource for ApiClient {
    async fn raw_recipe(&self, slug: &str) -> Result<Value, ApiError> {
        self.execute(Method::GET, self.recipe_url(slug)?, None).await
    }

    async fn replace_recipe(&self, slug: &str, document: &Value) -> Result<Value, ApiError> {
        self.execute(Method::PUT, self.recipe_url(slug)?, Some(document)).await
    }

    async fn patch_recipe(&self, slug: &str, patch: &Value) -> Result<Value, ApiError> {
        self.execute(Method::PATCH, self.recipe_url(slug)?, Some(patch)).await
    }

    async fn delete_recipe(&self, slug: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, self.recipe_url(slug)?, None)
            .await
            .map(|_| ())
    }

    async fn import_recipe(&self, url: &str) -> Result<String, ApiError> {
        let body = json!({ "url": url, "includeTags": true });
        let created = self
            .request(Method::POST, "/recipes/create/url", None, Some(&body))
            .await?;
        // Upstream answers with the bare slug string or with the new recipe.
        Ok(match created {
            Value::String(slug) => slug,
            other => other
                .get("slug")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn tags(&self) -> Result<TagPage, ApiError> {
        self.get_json(self.url("/organizers/tags", None)?).await
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, ApiError> {
        let body = json!({ "name": name });
        let created = self
            .request(Method::POST, "/organizers/tags", None, Some(&body))
            .await?;
        serde_json::from_value(created).map_err(|e| ApiError::decode(&e))
    }
}

#[async_trait]
impl GroupSlugSource for ApiClient {
    async fn fetch_group_slug(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let token = self.obtain_token(credentials).await?;
        let user = self.current_user(&token.access_token).await?;
        debug!(has_group = user.group_slug.is_some(), "Fetched current user");
        Ok(user
            .group_slug
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| FALLBACK_GROUP_SLUG.to_string()))
    }
}
