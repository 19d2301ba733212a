//! Network access for the worker.
//!
//! ### Network capability
//! - Strategies never talk to `reqwest` directly; they go through the
//!   [`Network`] trait so hosts and tests can inject their own transport.
//!
//! ### HTTP semantics
//! - A response with any status is a successful exchange. Only transport
//!   failures (DNS, refused connection, timeout) are [`FetchError`]s.
//! - Cross-origin `no-cors` requests produce opaque responses: status 0,
//!   headers hidden, body passed through untouched.
//! - Redirects are followed (max 5); an overall timeout applies only when configured.

pub mod error;
pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use shellcache_core::{AppConfig, Headers, Request, RequestMode, Response, ResponseKind};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, in_scope, is_loopback, parse_origin, resolve, same_origin};
pub use error::FetchError;

/// One request/response exchange with the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Errors only when no response was received.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Configuration for the HTTP network client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Overall request timeout (default: none, reqwest's behavior applies)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Served origin; decides between basic, cors and opaque responses.
    pub origin: Option<::url::Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            timeout: None,
            max_redirects: 5,
            origin: None,
        }
    }
}

impl FetchConfig {
    /// Derive the client configuration from the application configuration.
    pub fn from_app_config(config: &AppConfig, origin: ::url::Url) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            origin: Some(origin),
            ..Default::default()
        }
    }
}

/// `reqwest`-backed network.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn is_same_origin(&self, target: &::url::Url) -> bool {
        self.config.origin.as_ref().is_some_and(|origin| same_origin(origin, target))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let same_origin = self.is_same_origin(&request.url);
        let opaque = request.mode == RequestMode::NoCors && !same_origin;

        let response = builder.send().await?;
        let status = response.status();
        let final_url = response.url().clone();

        if opaque {
            // Body read failures are tolerated: the caller can't inspect it anyway.
            let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            tracing::debug!("fetched {} (opaque) in {}ms", request.url, start.elapsed().as_millis());
            return Ok(Response::opaque(body));
        }

        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            kind: if same_origin { ResponseKind::Basic } else { ResponseKind::Cors },
            url: Some(final_url),
        })
    }
}
