//! Entry operations on a generation.
//!
//! Entries are whole response snapshots. A write replaces any previous entry
//! for the same request key; nothing is patched in place.

use super::generations::CacheStore;
use super::key::{compute_entry_key, normalize_url};
use crate::http::{Headers, Request, Response, ResponseKind};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// A stored entry with its bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub generation: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub response: Response,
}

/// Row shape shared by the read queries.
#[derive(Debug)]
struct EntryRow {
    generation: String,
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    status_text: String,
    kind: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn into_entry(self) -> Result<CachedEntry, Error> {
        let headers: Headers = serde_json::from_str(&self.headers_json)?;
        let kind = ResponseKind::parse(&self.kind)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown response kind: {}", self.kind)))?;
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("status out of range: {}", self.status)))?;

        let response = Response {
            status,
            status_text: self.status_text,
            headers,
            body: self.body,
            kind,
            url: Url::parse(&self.url).ok(),
        };

        Ok(CachedEntry {
            generation: self.generation,
            key_hash: self.key_hash,
            method: self.method,
            url: self.url,
            stored_at: self.stored_at,
            response,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT generation, key_hash, method, url, status, status_text, kind,
        headers_json, body, stored_at FROM entries";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        generation: row.get(0)?,
        key_hash: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status: row.get(4)?,
        status_text: row.get(5)?,
        kind: row.get(6)?,
        headers_json: row.get(7)?,
        body: row.get(8)?,
        stored_at: row.get(9)?,
    })
}

/// Owned values bound to one INSERT.
struct PendingWrite {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    status_text: String,
    kind: &'static str,
    headers_json: String,
    body: Vec<u8>,
}

impl PendingWrite {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            key_hash: compute_entry_key(&request.method, &request.url),
            method: request.method.clone(),
            url: normalize_url(&request.url),
            status: i64::from(response.status),
            status_text: response.status_text.clone(),
            kind: response.kind.as_str(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }
}

const UPSERT: &str = "INSERT INTO entries (
        generation, key_hash, method, url, status, status_text, kind, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(generation, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        status_text = excluded.status_text,
        kind = excluded.kind,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

fn execute_write(conn: &rusqlite::Connection, generation: &str, write: &PendingWrite) -> Result<(), Error> {
    conn.execute(
        UPSERT,
        params![
            generation,
            &write.key_hash,
            &write.method,
            &write.url,
            write.status,
            &write.status_text,
            write.kind,
            &write.headers_json,
            &write.body,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl CacheStore {
    /// Store a response snapshot for the request, replacing any existing entry.
    ///
    /// Fails if the generation has been deleted.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let write = PendingWrite::new(request, response)?;
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> { execute_write(conn, &generation, &write) })
            .await
            .map_err(Error::from)
    }

    /// Store several snapshots atomically: either all are written or none.
    pub async fn put_all(&self, pairs: &[(Request, Response)]) -> Result<(), Error> {
        let writes = pairs
            .iter()
            .map(|(req, resp)| PendingWrite::new(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for write in &writes {
                    execute_write(&tx, &generation, write)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry stored for a request.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        Ok(self.entry(request).await?.map(|e| e.response))
    }

    /// Look up the GET entry stored for a URL.
    pub async fn match_url(&self, url: &Url) -> Result<Option<Response>, Error> {
        self.match_request(&Request::get(url.clone())).await
    }

    /// Fetch the full entry, including bookkeeping fields.
    pub async fn entry(&self, request: &Request) -> Result<Option<CachedEntry>, Error> {
        let key_hash = compute_entry_key(&request.method, &request.url);
        let generation = self.name.clone();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE generation = ?1 AND key_hash = ?2"))?;
                match stmt.query_row(params![generation, key_hash], read_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_entry).transpose()
    }

    /// Delete the entry for a request.
    ///
    /// Returns false if nothing was stored.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let key_hash = compute_entry_key(&request.method, &request.url);
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in this generation, oldest write first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY stored_at ASC, rowid ASC")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this generation.
    pub async fn len(&self) -> Result<u64, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
