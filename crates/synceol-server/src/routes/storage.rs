//! Record routes: `/{api}/{username}/storage/...`
//!
//! Only the fixed records can be read and written, and only the whole
//! account can be deleted. Deleting a single record is not supported.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use tracing::info;

use synceol_core::store::timestamp_now;

use super::{SyncTarget, weave_ok};
use crate::error::AppError;
use crate::state::AppState;

/// `GET /storage/{collection}/{id}` — 404 if the record was never written.
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    target: SyncTarget,
) -> Result<Response, AppError> {
    let name = target.record.ok_or_else(|| state.end_of_life())?;
    let record = state
        .store
        .get(&target.partition, name)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(weave_ok(timestamp_now(), Json(record.into_value())))
}

/// `PUT /storage/{collection}/{id}` — replace the record and return its
/// new `modified` stamp as the body.
pub async fn put_record(
    State(state): State<Arc<AppState>>,
    target: SyncTarget,
    body: Bytes,
) -> Result<Response, AppError> {
    let name = target.record.ok_or_else(|| state.end_of_life())?;
    let modified = state.store.put(&target.partition, name, &body).await?;
    Ok(weave_ok(modified, modified.to_string()))
}

/// `DELETE /storage` — drop the fixed records. Always succeeds.
pub async fn delete_all(State(state): State<Arc<AppState>>, target: SyncTarget) -> Response {
    state.store.delete_all(&target.partition).await;
    info!(username = target.partition.username(), "storage reset");
    weave_ok(timestamp_now(), "0")
}
