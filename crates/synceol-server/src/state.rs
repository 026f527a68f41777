//! Shared application state for the gateway.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the record store (cache client plus
//! credential hasher) and the pre-rendered end-of-life alert. Nothing in it
//! changes after startup.

use axum::http::HeaderValue;
use synceol_core::RecordStore;

use crate::config::{AlertError, EolAlert};
use crate::error::AppError;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Partitioned access to the fixed records.
    pub store: RecordStore,
    /// Rendered `X-Weave-Alert` header value.
    pub eol_alert: HeaderValue,
}

impl AppState {
    /// Build state from a store and the configured alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert cannot be rendered as a header value.
    pub fn new(store: RecordStore, alert: &EolAlert) -> Result<Self, AlertError> {
        Ok(Self {
            store,
            eol_alert: alert.to_header()?,
        })
    }

    /// The hard end-of-life response for this deployment.
    #[must_use]
    pub fn end_of_life(&self) -> AppError {
        AppError::EndOfLife(self.eol_alert.clone())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
