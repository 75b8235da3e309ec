//! Response snapshot storage within a generation.
//!
//! Snapshots are never updated in place: every write replaces the whole row
//! for its request identity, so concurrent writers resolve last-write-wins.

use super::generations::Generation;
use super::hash::{is_cacheable_method, request_key};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// An immutable capture of a response: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Canonical request URL this snapshot answers.
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    /// Header name/value pairs in response order. Values are the raw bytes
    /// received, which need not be UTF-8.
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

impl Snapshot {
    /// Raw value of the first header with this name, compared case-insensitively.
    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Like [`Snapshot::header_bytes`], but `None` when the value is not UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_bytes(name).and_then(|v| std::str::from_utf8(v).ok())
    }
}

fn insert(conn: &rusqlite::Connection, generation: &str, snapshot: &Snapshot) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&snapshot.headers).map_err(|e| Error::CorruptSnapshot(e.to_string()))?;

    conn.execute(
        "INSERT INTO entries (
            generation, request_key, method, url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(generation, request_key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            request_key(&snapshot.method, &snapshot.url),
            snapshot.method.to_ascii_uppercase(),
            &snapshot.url,
            snapshot.status as i64,
            &snapshot.status_text,
            headers_json,
            &snapshot.body,
            &snapshot.stored_at,
        ],
    )?;
    Ok(())
}

fn check_method(snapshot: &Snapshot) -> Result<(), Error> {
    if is_cacheable_method(&snapshot.method) {
        Ok(())
    } else {
        Err(Error::UnsupportedMethod(format!("{} {}", snapshot.method, snapshot.url)))
    }
}

impl Generation {
    /// Store a snapshot, replacing any entry with the same request identity.
    pub async fn put(&self, snapshot: &Snapshot) -> Result<(), Error> {
        check_method(snapshot)?;

        let generation = self.name.clone();
        let snapshot = snapshot.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> { insert(conn, &generation, &snapshot) })
            .await
            .map_err(Error::from)
    }

    /// Store several snapshots in one transaction: either all land or none.
    pub async fn put_all(&self, snapshots: Vec<Snapshot>) -> Result<(), Error> {
        for snapshot in &snapshots {
            check_method(snapshot)?;
        }

        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for snapshot in &snapshots {
                    insert(&tx, &generation, snapshot)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the snapshot stored for a request.
    ///
    /// Non-GET requests never match.
    pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<Snapshot>, Error> {
        if !is_cacheable_method(method) {
            return Ok(None);
        }

        let generation = self.name.clone();
        let key = request_key(method, url);
        self.db
            .conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let result = conn.query_row(
                    "SELECT method, url, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND request_key = ?2",
                    params![generation, key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, Vec<u8>>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    },
                );

                match result {
                    Ok((method, url, status, status_text, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptSnapshot(format!("{url}: {e}")))?;
                        let status =
                            u16::try_from(status).map_err(|_| Error::CorruptSnapshot(format!("{url}: status {status}")))?;
                        Ok(Some(Snapshot { url, method, status, status_text, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of all stored entries, in first-write order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored entries.
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
