//! Redis cache backend — the production default.
//!
//! Wraps a multiplexed async connection from the `redis` crate behind the
//! [`Cache`] trait. The connection is cheap to clone and pipelines commands
//! from concurrent tasks over one socket, so every call clones it rather
//! than holding a lock.
//!
//! TTLs map onto `SET key value EX seconds`. Redis rejects a zero expiry, so
//! sub-second TTLs are rounded up to one second.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::debug;

use crate::{Cache, CacheError};

/// Upper bound on establishing the initial connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A cache backed by Redis.
///
/// # Examples
///
/// ```no_run
/// # use synceol_cache::RedisCache;
/// # #[tokio::main]
/// # async fn main() {
/// let cache = RedisCache::connect("redis://127.0.0.1:6379").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connect`] if the URL is invalid, the server is
    /// unreachable, or the connection does not come up within 10 seconds.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        // Never echo the URL back: it may carry a password.
        let connect_err = |reason: String| CacheError::Connect {
            target: "[redacted]".to_owned(),
            reason,
        };

        let client = redis::Client::open(url).map_err(|e| connect_err(e.to_string()))?;
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| connect_err("connection timed out (10s)".to_owned()))?
            .map_err(|e| connect_err(e.to_string()))?;

        debug!("redis connection established");
        Ok(Self { conn })
    }
}

fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs.max(1)
    }
}

#[async_trait::async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| CacheError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, expiry_secs(ttl))
            .await
            .map_err(|e| CacheError::Write {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Delete {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }
}
