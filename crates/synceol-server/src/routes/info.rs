//! `GET /{api}/{username}/info/collections`

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::Json;

use synceol_core::store::timestamp_now;

use super::{SyncTarget, weave_ok};
use crate::error::AppError;
use crate::state::AppState;

/// Map each collection holding a fixed record to its latest `modified`.
///
/// A fresh partition returns `{}`.
pub async fn collections(
    State(state): State<Arc<AppState>>,
    target: SyncTarget,
) -> Result<Response, AppError> {
    let info = state.store.collections(&target.partition).await?;
    Ok(weave_ok(timestamp_now(), Json(info)))
}
