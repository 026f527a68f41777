//! Cache abstraction for the sync EOL gateway.
//!
//! This crate defines the [`Cache`] trait — a key-value interface with
//! per-entry time-to-live that knows nothing about sync records, users, or
//! credentials. `synceol-core` builds partitioned record keys on top of it.
//!
//! Two implementations are provided:
//!
//! - [`RedisCache`] — production default, backed by Redis (feature `redis-backend`)
//! - [`MemoryCache`] — in-process, for development and tests

mod error;
mod memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;

use std::time::Duration;

pub use error::CacheError;
pub use memory::MemoryCache;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisCache;

/// An expiring key-value cache.
///
/// Keys are UTF-8 strings using `/` as a separator (e.g.
/// `alice/3f2a.../meta/global`). Values are opaque byte arrays.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// Atomicity of a single `get`, `set`, or `delete` is the backend's concern;
/// callers do not coordinate concurrent writers to the same key.
#[async_trait::async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] if the underlying backend fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value, replacing any existing one, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`] if the underlying backend fails.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Delete a key. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
