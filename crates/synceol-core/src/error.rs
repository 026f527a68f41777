//! Error types for `synceol-core`.
//!
//! Variants never include record bodies, credential tokens, or key material —
//! only record names, cache keys (which contain the hashed partition, not
//! the token), and the underlying reason.

use synceol_cache::CacheError;

/// Errors from building the credential hasher.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// A configured secret must contain at least one byte.
    #[error("credential secret must not be empty")]
    EmptySecret,

    /// The HMAC implementation rejected the key.
    #[error("invalid credential secret: {reason}")]
    InvalidKey { reason: String },
}

/// Errors from reading or writing records.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The client sent a body that is not a JSON object.
    #[error("malformed record body: {reason}")]
    Malformed { reason: String },

    /// A cached value could not be decoded back into a record.
    #[error("corrupt record at '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// A record could not be encoded for the cache.
    #[error("failed to encode record '{record}': {reason}")]
    Encode { record: String, reason: String },

    /// The cache backend failed.
    #[error("record cache error: {0}")]
    Cache(#[from] CacheError),
}
