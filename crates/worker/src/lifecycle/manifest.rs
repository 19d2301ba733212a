//! Asset manifest: what a generation pre-populates at install.

use shellcache_core::Error;
use url::Url;

use crate::fetch::{resolve, same_origin};

/// One manifest entry, resolved against the served origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    /// Same-origin asset; install expects it to be fetchable.
    Local(Url),
    /// Cross-origin asset; fetched best-effort.
    Remote(Url),
}

impl ManifestEntry {
    pub fn url(&self) -> &Url {
        match self {
            ManifestEntry::Local(url) | ManifestEntry::Remote(url) => url,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ManifestEntry::Local(_))
    }
}

/// Ordered, de-duplicated list of assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    entries: Vec<ManifestEntry>,
}

impl AssetManifest {
    /// Resolve raw entries (origin-relative paths or absolute URLs) against `origin`.
    pub fn parse(origin: &Url, raw: &[String]) -> Result<Self, Error> {
        let mut entries: Vec<ManifestEntry> = Vec::with_capacity(raw.len());

        for item in raw {
            let url = resolve(origin, item).map_err(|e| Error::InvalidUrl(format!("manifest entry {item}: {e}")))?;

            if entries.iter().any(|e| e.url() == &url) {
                continue;
            }

            let entry =
                if same_origin(origin, &url) { ManifestEntry::Local(url) } else { ManifestEntry::Remote(url) };
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn local(&self) -> impl Iterator<Item = &Url> {
        self.entries.iter().filter(|e| e.is_local()).map(ManifestEntry::url)
    }

    pub fn remote(&self) -> impl Iterator<Item = &Url> {
        self.entries.iter().filter(|e| !e.is_local()).map(ManifestEntry::url)
    }

    /// Origins of the remote entries, serialized (`https://cdn.example`).
    pub fn remote_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = Vec::new();
        for url in self.remote() {
            let origin = url.origin().ascii_serialization();
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        origins
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
