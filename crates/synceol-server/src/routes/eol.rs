//! The hard end-of-life catch-all.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, Uri};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Answer with 513, body `"0"`, and the configured `X-Weave-Alert`.
pub async fn hard_eol(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> AppError {
    debug!(%method, path = uri.path(), "end-of-life response");
    state.end_of_life()
}
