//! Cached group-slug resolution for building recipe links.
//!
//! The group slug is cosmetic: it only appears in `/g/{group}/r/{slug}` links.
//! Resolution therefore never fails. After one failed attempt the resolver
//! stops talking to the auth endpoint and serves [`FALLBACK_GROUP_SLUG`] until
//! [`GroupSlugResolver::reset`] is called.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Credentials;
use crate::infra::http::ApiError;

use super::clock::{Clock, SystemClock};

pub const FALLBACK_GROUP_SLUG: &str = "home";

/// Network side of group-slug resolution: log in with credentials, then read
/// the current user's group.
#[async_trait]
pub trait GroupSlugSource: Send + Sync {
    async fn fetch_group_slug(&self, credentials: &Credentials) -> Result<String, ApiError>;
}

#[derive(Debug, Default)]
struct GroupSlugState {
    slug: Option<String>,
    resolved_at: Option<Instant>,
    auth_failed: bool,
}

impl GroupSlugState {
    fn fresh_slug(&self, now: Instant, ttl: Duration) -> Option<&str> {
        let resolved_at = self.resolved_at?;
        (now.saturating_duration_since(resolved_at) < ttl)
            .then_some(self.slug.as_deref())
            .flatten()
    }

    fn store(&mut self, slug: String, now: Instant) -> String {
        self.slug = Some(slug.clone());
        self.resolved_at = Some(now);
        slug
    }
}

pub struct GroupSlugResolver<S> {
    source: S,
    credentials: Option<Credentials>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<GroupSlugState>,
}

impl<S: GroupSlugSource> GroupSlugResolver<S> {
    pub fn new(source: S, credentials: Option<Credentials>, ttl: Duration) -> Self {
        Self::with_clock(source, credentials, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: S,
        credentials: Option<Credentials>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            credentials,
            ttl,
            clock,
            state: Mutex::new(GroupSlugState::default()),
        }
    }

    /// Return the group slug, resolving it over the network at most once per
    /// TTL and never again after a failure.
    pub async fn resolve(&self) -> String {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if let Some(slug) = state.fresh_slug(now, self.ttl) {
            return slug.to_string();
        }

        if state.auth_failed {
            return FALLBACK_GROUP_SLUG.to_string();
        }

        let Some(credentials) = self.credentials.as_ref() else {
            info!(
                group_slug = FALLBACK_GROUP_SLUG,
                "No username/password configured, using default group"
            );
            return state.store(FALLBACK_GROUP_SLUG.to_string(), now);
        };

        match self.source.fetch_group_slug(credentials).await {
            Ok(slug) => {
                info!(group_slug = %slug, "Cached group slug");
                state.store(slug, self.clock.now())
            }
            Err(err) => {
                counter!("mealie_group_slug_failure_total").increment(1);
                warn!(
                    error = %err,
                    group_slug = FALLBACK_GROUP_SLUG,
                    "Failed to resolve group slug, using default (will not retry)"
                );
                state.auth_failed = true;
                state.store(FALLBACK_GROUP_SLUG.to_string(), self.clock.now())
            }
        }
    }

    /// Forget the cached slug and the failure flag so the next call resolves again.
    pub async fn reset(&self) {
        *self.state.lock().await = GroupSlugState::default();
    }

    pub async fn auth_failed(&self) -> bool {
        self.state.lock().await.auth_failed
    }
}
