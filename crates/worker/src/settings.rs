//! Per-generation worker settings, resolved from [`AppConfig`].

use shellcache_core::{AppConfig, Error};
use url::Url;

use crate::classify::Classifier;
use crate::fallback::FallbackContent;
use crate::fetch::{parse_origin, resolve};
use crate::lifecycle::manifest::AssetManifest;

/// Everything one worker generation needs, with URLs already resolved.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Generation identifier; also the cache generation name.
    pub version: String,
    pub origin: Url,
    pub manifest: AssetManifest,
    pub app_shell: Url,
    pub classifier: Classifier,
    pub fallback: FallbackContent,
    /// Serialized origins besides `origin` whose responses may be cached.
    pub cacheable_origins: Vec<String>,
    /// URL substrings fetched in degraded no-cors mode.
    pub degraded_patterns: Vec<String>,
    pub skip_waiting_on_install: bool,
}

impl WorkerSettings {
    /// Resolve configuration against the served origin.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when the origin is missing and
    /// `Error::InvalidUrl` when any configured URL doesn't resolve.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.require_origin().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = parse_origin(origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;

        let manifest = AssetManifest::parse(&origin, &config.manifest)?;
        let app_shell =
            resolve(&origin, &config.app_shell).map_err(|e| Error::InvalidUrl(format!("app_shell: {e}")))?;

        let mut cacheable_origins = Vec::new();
        for raw in &config.cacheable_origins {
            let parsed = parse_origin(raw).map_err(|e| Error::InvalidUrl(format!("cacheable origin {raw}: {e}")))?;
            cacheable_origins.push(parsed.origin().ascii_serialization());
        }
        for remote in manifest.remote_origins() {
            if !cacheable_origins.contains(&remote) {
                cacheable_origins.push(remote);
            }
        }

        Ok(Self {
            version: config.version.clone(),
            origin,
            manifest,
            app_shell,
            classifier: Classifier::from_config(config),
            fallback: FallbackContent::from_config(config),
            cacheable_origins,
            degraded_patterns: config.degraded_patterns.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
        })
    }

    /// Same settings under a different generation identifier.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            origin: Some("https://app.example".into()),
            manifest: vec![
                "/".into(),
                "/app.html".into(),
                "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css".into(),
            ],
            cacheable_origins: vec!["https://foodninja-backend.onrender.com/".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config() {
        let settings = WorkerSettings::from_config(&config()).unwrap();
        assert_eq!(settings.version, "shellcache-v1");
        assert_eq!(settings.origin.as_str(), "https://app.example/");
        assert_eq!(settings.app_shell.as_str(), "https://app.example/app.html");
        assert_eq!(settings.manifest.len(), 3);
        assert_eq!(
            settings.cacheable_origins,
            vec!["https://foodninja-backend.onrender.com", "https://cdn.jsdelivr.net"]
        );
    }

    #[test]
    fn test_missing_origin() {
        let config = AppConfig::default();
        assert!(matches!(WorkerSettings::from_config(&config), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_with_version() {
        let settings = WorkerSettings::from_config(&config()).unwrap().with_version("food-v2.3.0");
        assert_eq!(settings.version, "food-v2.3.0");
    }
}
