//! Entry CRUD operations within a partition.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::store::EntryKey;
use crate::{Error, Response};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Get a stored response.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn get_entry(&self, partition: &str, key: &EntryKey) -> Result<Option<Response>, Error> {
        let partition = partition.to_string();
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                    FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, hash], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                        let status = u16::try_from(status)
                            .map_err(|_| Error::CorruptEntry(format!("status out of range: {status}")))?;
                        Ok(Some(Response { status, status_text, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace entries in one transaction, creating the partition if needed.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, partition: &str, entries: Vec<(EntryKey, Response)>) -> Result<(), Error> {
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let rows = entries
            .into_iter()
            .map(|(key, response)| {
                let headers_json = serde_json::to_string(&response.headers)?;
                Ok((key, response, headers_json))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (
                        partition, key_hash, method, url, status, status_text, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    )?;
                    for (key, response, headers_json) in &rows {
                        stmt.execute(params![
                            partition,
                            key.hash(),
                            key.method,
                            key.url,
                            response.status as i64,
                            response.status_text,
                            headers_json,
                            response.body,
                            now,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it was not present.
    pub async fn delete_entry(&self, partition: &str, key: &EntryKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2", params![partition, hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request identities stored in a partition, oldest write first.
    pub async fn entry_keys(&self, partition: &str) -> Result<Vec<EntryKey>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY stored_at, url")?;
                let keys = stmt
                    .query_map(params![partition], |row| Ok(EntryKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
