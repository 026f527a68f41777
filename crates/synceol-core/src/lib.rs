//! Core library for the sync 1.1 end-of-life gateway.
//!
//! - [`record`] — the three fixed records and `modified` stamping
//! - [`credential`] — hashing `Authorization` values into storage partitions
//! - [`store`] — partitioned get / put / delete-all / collection summary over a cache
//! - [`error`] — error types

pub mod credential;
pub mod error;
pub mod record;
pub mod store;

pub use credential::{CredentialHasher, SecretKey};
pub use error::{CredentialError, RecordError};
pub use record::{Record, RecordName};
pub use store::{Partition, RecordStore};
