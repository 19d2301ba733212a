//! Cache generation management.
//!
//! A generation is one versioned instance of the cache, named by the
//! deploy-time version string. Deleting a generation removes all of its
//! entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Summary of a stored generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

/// Handle to a single named generation.
///
/// Obtained from [`CacheDb::open_generation`] or [`CacheDb::generation`]. Cloning is cheap; the handle
/// stays valid after the generation is deleted, but reads then miss and
/// writes fail.
#[derive(Clone, Debug)]
pub struct CacheStore {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl CacheStore {
    /// The generation identifier this handle reads and writes.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheDb {
    /// Handle to a generation without creating it.
    ///
    /// Reads miss and writes fail until the generation is opened.
    pub fn generation(&self, name: &str) -> CacheStore {
        CacheStore { db: self.clone(), name: name.to_string() }
    }

    /// Open a generation, creating it if it doesn't exist yet.
    pub async fn open_generation(&self, name: &str) -> Result<CacheStore, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("generation name cannot be empty".into()));
        }

        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheStore { db: self.clone(), name: name.to_string() })
    }

    /// Check whether a generation exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// List generations with their entry counts.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key_hash)
                     FROM generations g
                     LEFT JOIN entries e ON e.generation = g.name
                     GROUP BY g.name
                     ORDER BY g.created_at ASC, g.rowid ASC",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(GenerationInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if the generation didn't exist.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation except `keep`.
    ///
    /// Returns the deleted names.
    pub async fn delete_generations_except(&self, keep: &str) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.generation_names().await? {
            if name != keep && self.delete_generation(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Delete every generation.
    pub async fn clear(&self) -> Result<Vec<String>, Error> {
        let names = self.generation_names().await?;
        for name in &names {
            self.delete_generation(name).await?;
        }
        Ok(names)
    }
}
