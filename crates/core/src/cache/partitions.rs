//! Partition-level operations: create, enumerate, drop, measure.

use super::connection::CacheDb;
use super::store::PartitionStats;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create a partition if it does not already exist.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in sorted order.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition; its entries go with it through the foreign key cascade.
    ///
    /// Returns false if no such partition existed.
    pub async fn drop_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry count and total body size of a partition. Missing partitions report zeros.
    pub async fn partition_stats(&self, name: &str) -> Result<PartitionStats, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<PartitionStats, Error> {
                let (count, size): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(LENGTH(body)), 0) FROM entries WHERE partition = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(PartitionStats { count: count as u64, size: size as u64 })
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::{CacheDb, EntryKey};
    use crate::Response;

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();
        db.open_partition("static-v1").await.unwrap();
        assert_eq!(db.list_partitions().await.unwrap(), vec!["static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_drop_partition_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = EntryKey::new("GET", "https://example.com/app.js");
        db.put_entries("static-v1", vec![(key.clone(), Response::new(200, "OK", "js"))])
            .await
            .unwrap();

        assert!(db.drop_partition("static-v1").await.unwrap());
        assert!(!db.drop_partition("static-v1").await.unwrap());

        db.open_partition("static-v1").await.unwrap();
        assert!(db.get_entry("static-v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partition_stats() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entries(
            "api-v1",
            vec![
                (EntryKey::new("GET", "https://api.github.com/a"), Response::new(200, "OK", "12345")),
                (EntryKey::new("GET", "https://api.github.com/b"), Response::new(200, "OK", "123")),
            ],
        )
        .await
        .unwrap();

        let stats = db.partition_stats("api-v1").await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.size, 8);

        let missing = db.partition_stats("nope").await.unwrap();
        assert_eq!(missing.count, 0);
        assert_eq!(missing.size, 0);
    }
}
