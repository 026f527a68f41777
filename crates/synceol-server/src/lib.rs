//! Sync 1.1 end-of-life gateway.
//!
//! Wires the record store and cache backend into an Axum server that tells
//! legacy sync clients the service has ended, while still serving the few
//! records their migration flow reads and writes.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
