//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation identifier. Must change on every deploy that changes a manifest asset.
    ///
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin the application is served from, e.g. `https://app.example`.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    /// Required at startup; checked with [`AppConfig::require_origin`].
    #[serde(default)]
    pub origin: Option<String>,

    /// Worker script location, relative to the origin.
    #[serde(default = "default_script_url")]
    pub script_url: String,

    /// Registration scope path.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Overall request timeout in milliseconds. Unset leaves the HTTP
    /// client's own behavior in place.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Path prefixes routed to the API strategy.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// File extensions (without the dot) routed to the static strategy.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Document served for navigations that miss both network and cache.
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// Asset manifest: origin-relative paths and absolute cross-origin URLs.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Cross-origin origins whose successful responses may be cached.
    #[serde(default)]
    pub cacheable_origins: Vec<String>,

    /// URL substrings of flaky cross-origin resources fetched in no-cors mode.
    #[serde(default = "default_degraded_patterns")]
    pub degraded_patterns: Vec<String>,

    /// Never intercept-and-cache requests to loopback hosts.
    #[serde(default = "default_true")]
    pub bypass_loopback: bool,

    /// Activate every new generation as soon as it has installed.
    #[serde(default)]
    pub skip_waiting_on_install: bool,

    /// Application name shown on the offline page.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Message embedded in offline API errors and the offline page.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Heading of the offline page.
    #[serde(default = "default_offline_heading")]
    pub offline_heading: String,

    /// Label of the reload control on the offline page.
    #[serde(default = "default_retry_label")]
    pub retry_label: String,
}

fn default_version() -> String {
    "shellcache-v1".into()
}

fn default_script_url() -> String {
    "/service-worker.js".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_api_prefixes() -> Vec<String> {
    ["/api/", "/predict", "/chat", "/ask_ai"].map(String::from).to_vec()
}

fn default_static_extensions() -> Vec<String> {
    ["css", "js", "mjs", "svg", "png", "jpg", "jpeg", "gif", "webp", "ico"]
        .map(String::from)
        .to_vec()
}

fn default_app_shell() -> String {
    "/app.html".into()
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/app.html", "/manifest.json"].map(String::from).to_vec()
}

fn default_degraded_patterns() -> Vec<String> {
    ["unsplash.com", "external-image"].map(String::from).to_vec()
}

fn default_true() -> bool {
    true
}

fn default_app_name() -> String {
    "App".into()
}

fn default_offline_message() -> String {
    "No network connection. Please try again later.".into()
}

fn default_offline_heading() -> String {
    "You are offline".into()
}

fn default_retry_label() -> String {
    "Retry".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: None,
            script_url: default_script_url(),
            scope: default_scope(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            api_prefixes: default_api_prefixes(),
            static_extensions: default_static_extensions(),
            app_shell: default_app_shell(),
            manifest: default_manifest(),
            cacheable_origins: Vec::new(),
            degraded_patterns: default_degraded_patterns(),
            bypass_loopback: true,
            skip_waiting_on_install: false,
            app_name: default_app_name(),
            offline_message: default_offline_message(),
            offline_heading: default_offline_heading(),
            retry_label: default_retry_label(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The served origin (deferred validation, like any required secret).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the origin is not set.
    pub fn require_origin(&self) -> Result<&str, ConfigError> {
        self.origin.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "origin".into(),
            hint: "Set SHELLCACHE_ORIGIN environment variable".into(),
        })
    }
}
