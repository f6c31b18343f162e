//! The partition store interface the router is written against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::{Error, Request, Response};

/// Identity of a stored entry: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
}

impl EntryKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    pub fn for_request(request: &Request) -> Self {
        Self::new(request.method.as_str(), request.url.as_str())
    }

    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

/// Entry count and stored body bytes of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionStats {
    pub count: u64,
    pub size: u64,
}

/// Named, isolated key-value cache scopes.
///
/// Individual operations are atomic; there is no cross-call transaction.
/// Concurrent writers to one key are last-write-wins.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Create the partition if missing. Idempotent.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Names of all existing partitions, sorted.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    /// Drop a partition and every entry in it. Returns false if it did not exist.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;

    async fn get(&self, partition: &str, key: &EntryKey) -> Result<Option<Response>, Error>;

    /// Upsert an entry, creating the partition if needed.
    async fn put(&self, partition: &str, key: &EntryKey, response: &Response) -> Result<(), Error>;

    /// Upsert all entries or none of them.
    async fn put_all(&self, partition: &str, entries: &[(EntryKey, Response)]) -> Result<(), Error>;

    async fn delete(&self, partition: &str, key: &EntryKey) -> Result<bool, Error>;

    async fn keys(&self, partition: &str) -> Result<Vec<EntryKey>, Error>;

    async fn stats(&self, partition: &str) -> Result<PartitionStats, Error>;
}

#[async_trait]
impl PartitionStore for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.open_partition(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.list_partitions().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        self.drop_partition(partition).await
    }

    async fn get(&self, partition: &str, key: &EntryKey) -> Result<Option<Response>, Error> {
        self.get_entry(partition, key).await
    }

    async fn put(&self, partition: &str, key: &EntryKey, response: &Response) -> Result<(), Error> {
        self.put_entries(partition, vec![(key.clone(), response.clone())]).await
    }

    async fn put_all(&self, partition: &str, entries: &[(EntryKey, Response)]) -> Result<(), Error> {
        self.put_entries(partition, entries.to_vec()).await
    }

    async fn delete(&self, partition: &str, key: &EntryKey) -> Result<bool, Error> {
        self.delete_entry(partition, key).await
    }

    async fn keys(&self, partition: &str) -> Result<Vec<EntryKey>, Error> {
        self.entry_keys(partition).await
    }

    async fn stats(&self, partition: &str) -> Result<PartitionStats, Error> {
        self.partition_stats(partition).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_entry_key_for_request() {
        let request = Request::get(Url::parse("https://example.com/app.js").unwrap());
        let key = EntryKey::for_request(&request);
        assert_eq!(key.method, "GET");
        assert_eq!(key.url, "https://example.com/app.js");
        assert_eq!(key.hash(), compute_cache_key("GET", "https://example.com/app.js"));
    }

    #[tokio::test]
    async fn test_store_through_trait_object() {
        let store: std::sync::Arc<dyn PartitionStore> = std::sync::Arc::new(CacheDb::open_in_memory().await.unwrap());
        let key = EntryKey::new("get", "https://example.com/");

        store.put("dynamic-v1", &key, &Response::new(200, "OK", "hello")).await.unwrap();

        let hit = store.get("dynamic-v1", &key).await.unwrap().unwrap();
        assert_eq!(hit.text(), "hello");
        assert_eq!(store.partitions().await.unwrap(), vec!["dynamic-v1".to_string()]);
    }
}
