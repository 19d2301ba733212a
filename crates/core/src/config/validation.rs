//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_absolute_http(entry: &str) -> bool {
    Url::parse(entry).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `user_agent` is empty
    /// - `timeout_ms` is set to less than 100ms or more than 5 minutes
    /// - `origin`, when set, is not an absolute http(s) URL
    /// - `scope`, `app_shell` or an API prefix does not start with `/`
    /// - a manifest entry is neither a `/`-path nor an absolute http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(invalid("timeout_ms", "must be at least 100ms"));
            }
            if timeout_ms > 300_000 {
                return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if let Some(origin) = &self.origin
            && !is_absolute_http(origin)
        {
            return Err(invalid("origin", format!("not an absolute http(s) URL: {origin}")));
        }

        if !self.scope.starts_with('/') {
            return Err(invalid("scope", "must start with '/'"));
        }

        if !self.app_shell.starts_with('/') {
            return Err(invalid("app_shell", "must start with '/'"));
        }

        if let Some(prefix) = self.api_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("api_prefixes", format!("prefix must start with '/': {prefix}")));
        }

        if let Some(ext) = self.static_extensions.iter().find(|e| e.is_empty() || e.contains('.')) {
            return Err(invalid("static_extensions", format!("expected a bare extension: {ext:?}")));
        }

        if let Some(entry) = self
            .manifest
            .iter()
            .find(|e| !e.starts_with('/') && !is_absolute_http(e))
        {
            return Err(invalid("manifest", format!("unsupported entry: {entry}")));
        }

        if let Some(origin) = self.cacheable_origins.iter().find(|o| !is_absolute_http(o)) {
            return Err(invalid("cacheable_origins", format!("not an absolute http(s) URL: {origin}")));
        }

        if !self.manifest.iter().any(|e| e == &self.app_shell) {
            tracing::warn!(
                app_shell = %self.app_shell,
                manifest_len = self.manifest.len(),
                "app_shell is not in the manifest; offline navigations fall back to the generated page \
                 until it has been fetched once"
            );
        }

        Ok(())
    }
}
