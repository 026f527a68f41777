//! Cache error types.
//!
//! Every variant carries the key (or target) and the backend's reason so a
//! failure can be diagnosed from the log line alone.

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to connect to the cache at the given target.
    #[error("failed to connect to cache at '{target}': {reason}")]
    Connect { target: String, reason: String },

    /// Failed to read a value.
    #[error("failed to read key '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Failed to write a value.
    #[error("failed to write key '{key}': {reason}")]
    Write { key: String, reason: String },

    /// Failed to delete a key.
    #[error("failed to delete key '{key}': {reason}")]
    Delete { key: String, reason: String },
}
