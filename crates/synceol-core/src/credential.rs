//! Credential partitioning.
//!
//! The gateway does not authenticate anyone. It HMACs the trailing token of
//! the `Authorization` header with a process secret and uses the digest as
//! part of every cache key, so distinct header values address disjoint
//! storage and identical header values always address the same storage.
//! A missing header hashes the empty string and is a partition of its own.
//!
//! Nothing checks that the caller is entitled to a partition. Anyone who
//! sends the same header value reads the same records.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CredentialError;

type HmacSha256 = Hmac<Sha256>;

/// Process-wide secret keying the credential hash.
///
/// Zeroized on drop and redacted from `Debug`.
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    /// Wrap configured key material.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::EmptySecret`] if `bytes` is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, CredentialError> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(CredentialError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    /// Generate 32 random bytes.
    ///
    /// Only lives as long as the process, so a restart orphans every
    /// existing partition.
    #[must_use]
    pub fn generate() -> Self {
        // Two UUID v4s = 32 bytes of OS CSPRNG randomness.
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        let mut key = Zeroizing::new(Vec::with_capacity(32));
        key.extend_from_slice(a.as_bytes());
        key.extend_from_slice(b.as_bytes());
        Self(key)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// The token an `Authorization` header contributes to the partition.
///
/// This is the last whitespace-delimited word, so `Basic ONE` and `ONE`
/// share a partition. A missing or blank header yields `""`.
#[must_use]
pub fn credential_token(authorization: Option<&str>) -> &str {
    authorization
        .and_then(|value| value.split_whitespace().next_back())
        .unwrap_or("")
}

/// Hashes `Authorization` tokens into partition identifiers.
#[derive(Clone)]
pub struct CredentialHasher {
    mac: HmacSha256,
}

impl CredentialHasher {
    /// Key a hasher with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidKey`] if the HMAC rejects the key.
    pub fn new(secret: &SecretKey) -> Result<Self, CredentialError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| CredentialError::InvalidKey {
                reason: e.to_string(),
            })?;
        Ok(Self { mac })
    }

    /// Hex-encoded HMAC-SHA256 of the header's trailing token.
    #[must_use]
    pub fn partition(&self, authorization: Option<&str>) -> String {
        let mut mac = self.mac.clone();
        mac.update(credential_token(authorization).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hasher(secret: &str) -> CredentialHasher {
        CredentialHasher::new(&SecretKey::new(secret).unwrap()).unwrap()
    }

    #[test]
    fn token_is_last_word() {
        assert_eq!(credential_token(Some("Basic ONE")), "ONE");
        assert_eq!(credential_token(Some("ONE")), "ONE");
        assert_eq!(credential_token(Some("  Hawk  id=\"x\", mac=\"y\"  ")), "mac=\"y\"");
        assert_eq!(credential_token(Some("   ")), "");
        assert_eq!(credential_token(None), "");
    }

    #[test]
    fn same_header_same_partition() {
        let h = hasher("s3cret");
        assert_eq!(h.partition(Some("Basic ONE")), h.partition(Some("Basic ONE")));
        assert_eq!(h.partition(None), h.partition(Some("")));
    }

    #[test]
    fn different_headers_different_partitions() {
        let h = hasher("s3cret");
        let none = h.partition(None);
        let one = h.partition(Some("Basic ONE"));
        let two = h.partition(Some("Basic TWO"));
        assert_ne!(none, one);
        assert_ne!(one, two);
        assert_ne!(none, two);
    }

    #[test]
    fn partition_depends_on_secret() {
        let a = hasher("first").partition(Some("Basic ONE"));
        let b = hasher("second").partition(Some("Basic ONE"));
        assert_ne!(a, b);
    }

    #[test]
    fn partition_is_hex_sha256() {
        let p = hasher("s3cret").partition(Some("Basic ONE"));
        assert_eq!(p.len(), 64);
        assert!(p.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(!p.contains("ONE"));
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(matches!(SecretKey::new(""), Err(CredentialError::EmptySecret)));
    }

    #[test]
    fn generated_secrets_differ_and_are_redacted() {
        let a = SecretKey::generate();
        let b = SecretKey::generate();
        assert_eq!(a.as_bytes().len(), 32);
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(format!("{a:?}"), "SecretKey([REDACTED])");
    }
}
