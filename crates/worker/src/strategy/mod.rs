//! Caching strategies, one per request category.
//!
//! | category   | strategy                                  |
//! |------------|-------------------------------------------|
//! | api        | network first, cache fallback, offline JSON |
//! | static     | cache first, network fallback + populate  |
//! | navigation | network first, cached page, app shell, offline page |
//! | other      | network only, degraded no-cors for flaky hosts |
//!
//! Cache reads that fail are treated as misses. Cache writes that fail are
//! logged and never change the response.

pub mod api;
pub mod navigation;
pub mod passthrough;
pub mod static_asset;

use serde::Serialize;
use shellcache_core::{CacheStore, Request, Response, ResponseKind};
use url::Url;

use crate::classify::Category;
use crate::fallback::FallbackContent;
use crate::fetch::{FetchError, Network, same_origin};
use crate::settings::WorkerSettings;
use crate::wait::WaitUntil;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    AppShell,
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Cache => "cache",
            Source::AppShell => "app_shell",
            Source::Fallback => "fallback",
        }
    }
}

/// A strategy's answer to an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    pub fn new(response: Response, source: Source) -> Self {
        Self { response, source }
    }
}

/// Decides which responses may be written and which hosts are fetched degraded.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    origin: Url,
    declared_origins: Vec<String>,
    degraded_patterns: Vec<String>,
}

impl CachePolicy {
    pub fn new(origin: Url, declared_origins: Vec<String>, degraded_patterns: Vec<String>) -> Self {
        Self { origin, declared_origins, degraded_patterns }
    }

    pub fn from_settings(settings: &WorkerSettings) -> Self {
        Self::new(
            settings.origin.clone(),
            settings.cacheable_origins.clone(),
            settings.degraded_patterns.clone(),
        )
    }

    /// GET, 2xx, non-opaque, and same-origin or from a declared origin.
    pub fn may_store(&self, request: &Request, response: &Response) -> bool {
        if !request.is_safe_read() || !response.is_success() {
            return false;
        }
        if response.kind == ResponseKind::Opaque {
            return false;
        }
        same_origin(&self.origin, &request.url)
            || self.declared_origins.contains(&request.url.origin().ascii_serialization())
    }

    /// Whether the URL belongs to a known-flaky resource class.
    pub fn is_degraded(&self, url: &Url) -> bool {
        let url = url.as_str();
        self.degraded_patterns.iter().any(|p| !p.is_empty() && url.contains(p.as_str()))
    }
}

/// Collaborators a strategy works with for one request.
pub struct StrategyContext<'a> {
    pub network: &'a dyn Network,
    pub cache: &'a CacheStore,
    pub policy: &'a CachePolicy,
    pub fallback: &'a FallbackContent,
    pub app_shell: &'a Url,
    pub waits: &'a WaitUntil,
}

impl StrategyContext<'_> {
    /// Cache lookup where a storage failure reads as a miss.
    pub(crate) async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.cache.match_request(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache read failed for {}: {}", request.url, e);
                None
            }
        }
    }

    pub(crate) async fn lookup_url(&self, url: &Url) -> Option<Response> {
        match self.cache.match_url(url).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache read failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Write-through when the policy allows it. Failures are logged only.
    pub(crate) async fn store(&self, request: &Request, response: &Response) {
        if !self.policy.may_store(request, response) {
            return;
        }
        if let Err(e) = self.cache.put(request, response).await {
            tracing::warn!("cache write failed for {}: {}", request.url, e);
        }
    }

    /// Same as [`store`](Self::store) but detached from the response path.
    pub(crate) fn store_in_background(&self, request: &Request, response: &Response) {
        if !self.policy.may_store(request, response) {
            return;
        }
        let cache = self.cache.clone();
        let request = request.clone();
        let response = response.clone();
        self.waits.spawn(async move {
            if let Err(e) = cache.put(&request, &response).await {
                tracing::warn!("background cache write failed for {}: {}", request.url, e);
            }
        });
    }
}

/// Run the strategy bound to `category`.
pub async fn execute(category: Category, request: &Request, ctx: &StrategyContext<'_>) -> Result<Served, FetchError> {
    match category {
        Category::Api => api::network_first(request, ctx).await,
        Category::Static => static_asset::cache_first(request, ctx).await,
        Category::Navigation => navigation::network_first(request, ctx).await,
        Category::Other => passthrough::network_only(request, ctx).await,
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::testing::{ORIGIN, StubNetwork, memory_db, url};
    use std::sync::Arc;

    /// Owned collaborators a [`StrategyContext`] can borrow from.
    pub struct Fixture {
        pub network: Arc<StubNetwork>,
        pub cache: CacheStore,
        pub policy: CachePolicy,
        pub fallback: FallbackContent,
        pub app_shell: Url,
        pub waits: WaitUntil,
    }

    impl Fixture {
        pub async fn new() -> Self {
            let db = memory_db().await;
            Self {
                network: StubNetwork::new(),
                cache: db.open_generation("test-v1").await.unwrap(),
                policy: CachePolicy::new(
                    Url::parse(ORIGIN).unwrap(),
                    vec!["https://cdn.jsdelivr.net".into()],
                    vec!["unsplash.com".into(), "external-image".into()],
                ),
                fallback: FallbackContent::default(),
                app_shell: url("/app.html"),
                waits: WaitUntil::new(),
            }
        }

        pub fn ctx(&self) -> StrategyContext<'_> {
            StrategyContext {
                network: self.network.as_ref(),
                cache: &self.cache,
                policy: &self.policy,
                fallback: &self.fallback,
                app_shell: &self.app_shell,
                waits: &self.waits,
            }
        }
    }
}
