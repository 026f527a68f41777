//! Partitioned record store over a [`Cache`].
//!
//! Every record lives at `{prefix}{username}/{partition}/{record}` where
//! `partition` is the credential hash from [`CredentialHasher`]. The store
//! holds no records itself; each call goes straight to the cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use synceol_cache::Cache;
use tracing::{debug, warn};

use crate::credential::CredentialHasher;
use crate::error::RecordError;
use crate::record::{Record, RecordName};

/// Current time in whole seconds since the Unix epoch.
#[must_use]
pub fn timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The storage area addressed by one username and one `Authorization` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    username: String,
    credential_hash: String,
}

impl Partition {
    /// Username this partition belongs to.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Reads and writes the fixed records.
pub struct RecordStore {
    cache: Arc<dyn Cache>,
    hasher: CredentialHasher,
    key_prefix: String,
    ttl: Duration,
}

impl RecordStore {
    /// Create a store writing records with `ttl` under `key_prefix`.
    #[must_use]
    pub fn new(
        cache: Arc<dyn Cache>,
        hasher: CredentialHasher,
        key_prefix: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            hasher,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    /// Resolve the partition for `username` and a raw `Authorization` value.
    #[must_use]
    pub fn partition(&self, username: &str, authorization: Option<&str>) -> Partition {
        Partition {
            username: username.to_owned(),
            credential_hash: self.hasher.partition(authorization),
        }
    }

    fn key(&self, partition: &Partition, name: RecordName) -> String {
        format!(
            "{}{}/{}/{}",
            self.key_prefix,
            partition.username,
            partition.credential_hash,
            name.as_str()
        )
    }

    /// Read a record. `Ok(None)` if it was never written or has expired.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Cache`] on backend failure and
    /// [`RecordError::Corrupt`] if the cached value is not a JSON object.
    pub async fn get(
        &self,
        partition: &Partition,
        name: RecordName,
    ) -> Result<Option<Record>, RecordError> {
        let key = self.key(partition, name);
        match self.cache.get(&key).await? {
            Some(bytes) => Record::decode(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Replace a record with `body`, stamped with the current time.
    ///
    /// Returns the stamp. Nothing is written if the body is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if `body` is not a JSON object and
    /// [`RecordError::Cache`] on backend failure.
    pub async fn put(
        &self,
        partition: &Partition,
        name: RecordName,
        body: &[u8],
    ) -> Result<i64, RecordError> {
        let now = timestamp_now();
        let mut record = Record::from_body(body)?;
        record.stamp(now);

        let key = self.key(partition, name);
        self.cache.set(&key, &record.encode(name)?, self.ttl).await?;

        debug!(username = %partition.username, record = %name, modified = now, "record written");
        Ok(now)
    }

    /// Best-effort delete of every fixed record in the partition.
    ///
    /// Missing records are fine. Backend failures are logged and skipped so
    /// a client resetting its account is never blocked.
    pub async fn delete_all(&self, partition: &Partition) {
        for name in RecordName::ALL {
            let key = self.key(partition, name);
            if let Err(e) = self.cache.delete(&key).await {
                warn!(
                    username = %partition.username,
                    record = %name,
                    error = %e,
                    "failed to delete record"
                );
            }
        }
    }

    /// Latest `modified` per collection across the records that exist.
    ///
    /// Collections with no record are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns the first read failure.
    pub async fn collections(
        &self,
        partition: &Partition,
    ) -> Result<BTreeMap<&'static str, i64>, RecordError> {
        let mut info = BTreeMap::new();
        for name in RecordName::ALL {
            let Some(record) = self.get(partition, name).await? else {
                continue;
            };
            let Some(modified) = record.modified() else {
                continue;
            };
            info.entry(name.collection())
                .and_modify(|latest: &mut i64| *latest = (*latest).max(modified))
                .or_insert(modified);
        }
        Ok(info)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("key_prefix", &self.key_prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use synceol_cache::{CacheError, MemoryCache};

    use super::*;
    use crate::credential::SecretKey;

    const TWO_DAYS: Duration = Duration::from_secs(172_800);

    fn store_over(cache: Arc<dyn Cache>, prefix: &str, ttl: Duration) -> RecordStore {
        let hasher = CredentialHasher::new(&SecretKey::new("test-secret").unwrap()).unwrap();
        RecordStore::new(cache, hasher, prefix, ttl)
    }

    fn store() -> (RecordStore, MemoryCache) {
        let cache = MemoryCache::new();
        (store_over(Arc::new(cache.clone()), "", TWO_DAYS), cache)
    }

    #[tokio::test]
    async fn fresh_partition_is_empty() {
        let (store, _) = store();
        let p = store.partition("alice", None);
        assert!(store.collections(&p).await.unwrap().is_empty());
        for name in RecordName::ALL {
            assert!(store.get(&p, name).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn put_stamps_and_get_returns_it() {
        let (store, _) = store();
        let p = store.partition("alice", None);
        let before = timestamp_now();
        let ts = store
            .put(&p, RecordName::MetaGlobal, br#"{"from":0}"#)
            .await
            .unwrap();
        assert!(ts >= before);

        let record = store.get(&p, RecordName::MetaGlobal).await.unwrap().unwrap();
        assert_eq!(record.modified(), Some(ts));
        assert_eq!(record.fields()["from"], 0);
    }

    #[tokio::test]
    async fn put_replaces_without_merge() {
        let (store, _) = store();
        let p = store.partition("alice", None);
        store.put(&p, RecordName::CryptoKeys, br#"{"a":1}"#).await.unwrap();
        store.put(&p, RecordName::CryptoKeys, br#"{"b":2}"#).await.unwrap();

        let record = store.get(&p, RecordName::CryptoKeys).await.unwrap().unwrap();
        assert!(!record.fields().contains_key("a"));
        assert_eq!(record.fields()["b"], 2);
    }

    #[tokio::test]
    async fn malformed_put_writes_nothing() {
        let (store, cache) = store();
        let p = store.partition("alice", None);
        let err = store.put(&p, RecordName::MetaGlobal, b"[{}]").await.unwrap_err();
        assert!(matches!(err, RecordError::Malformed { .. }));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn partitions_are_disjoint() {
        let (store, _) = store();
        let anon = store.partition("alice", None);
        let one = store.partition("alice", Some("Basic ONE"));
        let bob = store.partition("bob", None);

        store.put(&one, RecordName::MetaGlobal, b"{}").await.unwrap();
        assert!(store.get(&anon, RecordName::MetaGlobal).await.unwrap().is_none());
        assert!(store.get(&bob, RecordName::MetaGlobal).await.unwrap().is_none());
        assert!(store.get(&one, RecordName::MetaGlobal).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn collections_reports_max_per_prefix() {
        let (store, cache) = store();
        let p = store.partition("alice", None);

        // Hand-place records so the two meta stamps differ.
        cache
            .set(&store.key(&p, RecordName::MetaGlobal), br#"{"modified":10}"#, TWO_DAYS)
            .await
            .unwrap();
        cache
            .set(
                &store.key(&p, RecordName::MetaFxaCredentials),
                br#"{"modified":30}"#,
                TWO_DAYS,
            )
            .await
            .unwrap();
        cache
            .set(&store.key(&p, RecordName::CryptoKeys), br#"{"modified":20}"#, TWO_DAYS)
            .await
            .unwrap();

        let info = store.collections(&p).await.unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(info["meta"], 30);
        assert_eq!(info["crypto"], 20);
    }

    #[tokio::test]
    async fn delete_all_clears_partition_only() {
        let (store, _) = store();
        let mine = store.partition("alice", None);
        let other = store.partition("alice", Some("Basic ONE"));
        for name in RecordName::ALL {
            store.put(&mine, name, b"{}").await.unwrap();
        }
        store.put(&other, RecordName::MetaGlobal, b"{}").await.unwrap();

        store.delete_all(&mine).await;
        store.delete_all(&mine).await;

        assert!(store.collections(&mine).await.unwrap().is_empty());
        assert!(store.get(&other, RecordName::MetaGlobal).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn key_prefix_and_ttl_apply() {
        let cache = MemoryCache::new();
        let store = store_over(Arc::new(cache.clone()), "eol:", Duration::ZERO);
        let p = store.partition("alice", None);

        let key = store.key(&p, RecordName::CryptoKeys);
        assert!(key.starts_with("eol:alice/"));
        assert!(key.ends_with("/crypto/keys"));

        // Zero TTL: written, then immediately expired.
        store.put(&p, RecordName::CryptoKeys, b"{}").await.unwrap();
        assert!(store.get(&p, RecordName::CryptoKeys).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_cached_value_is_an_error() {
        let (store, cache) = store();
        let p = store.partition("alice", None);
        cache
            .set(&store.key(&p, RecordName::MetaGlobal), b"garbage", TWO_DAYS)
            .await
            .unwrap();
        let err = store.get(&p, RecordName::MetaGlobal).await.unwrap_err();
        assert!(matches!(err, RecordError::Corrupt { .. }));
    }

    struct DownCache;

    #[async_trait::async_trait]
    impl Cache for DownCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Read { key: key.to_owned(), reason: "down".to_owned() })
        }

        async fn set(&self, key: &str, _: &[u8], _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Write { key: key.to_owned(), reason: "down".to_owned() })
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            Err(CacheError::Delete { key: key.to_owned(), reason: "down".to_owned() })
        }
    }

    #[tokio::test]
    async fn cache_failures_propagate_except_delete_all() {
        let store = store_over(Arc::new(DownCache), "", TWO_DAYS);
        let p = store.partition("alice", None);

        assert!(matches!(
            store.get(&p, RecordName::MetaGlobal).await,
            Err(RecordError::Cache(CacheError::Read { .. }))
        ));
        assert!(matches!(
            store.put(&p, RecordName::MetaGlobal, b"{}").await,
            Err(RecordError::Cache(CacheError::Write { .. }))
        ));
        assert!(store.collections(&p).await.is_err());
        store.delete_all(&p).await;
    }
}
