//! Request classification.
//!
//! Maps each intercepted request onto the strategy category that serves it.
//! Rules, in priority order:
//!
//! 1. Non-GET methods and non-http(s) schemes are not intercepted.
//! 2. Loopback hosts are passthrough (when `bypass_loopback` is on).
//! 3. API path prefix → [`Category::Api`].
//! 4. Static file extension → [`Category::Static`].
//! 5. `Accept` containing `text/html` → [`Category::Navigation`].
//! 6. Anything else → [`Category::Other`].

use shellcache_core::{AppConfig, Request};
use std::fmt;

use crate::fetch::is_loopback;

/// Strategy category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Api,
    Static,
    Navigation,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Api => "api",
            Category::Static => "static",
            Category::Navigation => "navigation",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: the request goes to the network untouched.
    Bypass,
    /// Intercepted and served by the strategy bound to the category.
    Intercept(Category),
}

/// Request classifier configured with the integrator's API endpoints.
#[derive(Debug, Clone)]
pub struct Classifier {
    api_prefixes: Vec<String>,
    static_extensions: Vec<String>,
    bypass_loopback: bool,
}

impl Classifier {
    pub fn new(api_prefixes: Vec<String>, static_extensions: Vec<String>, bypass_loopback: bool) -> Self {
        let static_extensions = static_extensions.into_iter().map(|e| e.to_ascii_lowercase()).collect();
        Self { api_prefixes, static_extensions, bypass_loopback }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_prefixes.clone(), config.static_extensions.clone(), config.bypass_loopback)
    }

    /// Classify a request. Pure: no I/O, same input gives the same route.
    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_safe_read() {
            return Route::Bypass;
        }

        if !matches!(request.url.scheme(), "http" | "https") {
            return Route::Bypass;
        }

        if self.bypass_loopback && is_loopback(&request.url) {
            return Route::Intercept(Category::Other);
        }

        let path = request.url.path();

        if self.is_api_path(path) {
            Route::Intercept(Category::Api)
        } else if self.is_static_path(path) {
            Route::Intercept(Category::Static)
        } else if accepts_html(request) {
            Route::Intercept(Category::Navigation)
        } else {
            Route::Intercept(Category::Other)
        }
    }

    fn is_api_path(&self, path: &str) -> bool {
        self.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn is_static_path(&self, path: &str) -> bool {
        extension(path).is_some_and(|ext| self.static_extensions.iter().any(|e| e == &ext))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Lowercased extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn accepts_html(request: &Request) -> bool {
    request.accept().is_some_and(|accept| accept.to_ascii_lowercase().contains("text/html"))
}
