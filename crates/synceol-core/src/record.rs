//! The fixed records a sunset account may still hold.
//!
//! Only three documents survive the end of life: `meta/global`,
//! `meta/fxa_credentials`, and `crypto/keys`. Each is an arbitrary JSON
//! object supplied by the client, plus a server-stamped `modified` field in
//! whole seconds since the epoch. Writes replace the whole object.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::RecordError;

/// Field the server stamps on every write.
pub const MODIFIED_FIELD: &str = "modified";

/// One of the three record names still served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordName {
    /// `meta/global`
    MetaGlobal,
    /// `meta/fxa_credentials`
    MetaFxaCredentials,
    /// `crypto/keys`
    CryptoKeys,
}

impl RecordName {
    /// Every record name, in the order `info/collections` reads them.
    pub const ALL: [Self; 3] = [Self::MetaGlobal, Self::MetaFxaCredentials, Self::CryptoKeys];

    /// Resolve a `/storage/{collection}/{id}` pair to a record name.
    ///
    /// Returns `None` for anything that is not one of the fixed records.
    #[must_use]
    pub fn from_path(collection: &str, id: &str) -> Option<Self> {
        match (collection, id) {
            ("meta", "global") => Some(Self::MetaGlobal),
            ("meta", "fxa_credentials") => Some(Self::MetaFxaCredentials),
            ("crypto", "keys") => Some(Self::CryptoKeys),
            _ => None,
        }
    }

    /// Full name, e.g. `meta/global`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MetaGlobal => "meta/global",
            Self::MetaFxaCredentials => "meta/fxa_credentials",
            Self::CryptoKeys => "crypto/keys",
        }
    }

    /// Collection prefix (the part before `/`), e.g. `meta`.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::MetaGlobal | Self::MetaFxaCredentials => "meta",
            Self::CryptoKeys => "crypto",
        }
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record: a JSON object with a `modified` stamp once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Parse a client request body.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if the body is not valid JSON or is
    /// valid JSON but not an object (so it cannot carry `modified`).
    pub fn from_body(body: &[u8]) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| RecordError::Malformed {
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RecordError::Malformed {
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Decode a value read back from the cache under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Corrupt`] if the bytes are not a JSON object.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, RecordError> {
        match serde_json::from_slice(bytes) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(other) => Err(RecordError::Corrupt {
                key: key.to_owned(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(RecordError::Corrupt {
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    /// Encode for the cache.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Encode`] if serialization fails.
    pub fn encode(&self, name: RecordName) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(&self.fields).map_err(|e| RecordError::Encode {
            record: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Set `modified`, overwriting any client-supplied value.
    pub fn stamp(&mut self, modified: i64) {
        self.fields
            .insert(MODIFIED_FIELD.to_owned(), Value::from(modified));
    }

    /// The `modified` stamp, if present and integral.
    #[must_use]
    pub fn modified(&self) -> Option<i64> {
        self.fields.get(MODIFIED_FIELD).and_then(Value::as_i64)
    }

    /// Borrow the JSON fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the record into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
