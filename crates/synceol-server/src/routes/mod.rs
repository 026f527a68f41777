//! Route table for the gateway.
//!
//! Every served path lives under `/{api}/{username}`:
//!
//! - `GET    /info/collections` — latest `modified` per collection
//! - `GET    /storage/{collection}/{id}` — read a fixed record
//! - `PUT    /storage/{collection}/{id}` — write a fixed record
//! - `DELETE /storage` — reset the account (best effort)
//!
//! Any other method on those paths, any `{collection}/{id}` that is not a
//! fixed record, an unknown api version, a bad username, and every other
//! path get the hard end-of-life response.

pub mod eol;
pub mod info;
pub mod storage;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::Router;
use tokio::sync::Semaphore;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use synceol_core::{Partition, RecordName};

use crate::error::AppError;
use crate::state::AppState;

/// Server clock, whole seconds, on every successful response.
pub static X_WEAVE_TIMESTAMP: HeaderName = HeaderName::from_static("x-weave-timestamp");
/// End-of-life notice on 513 responses.
pub static X_WEAVE_ALERT: HeaderName = HeaderName::from_static("x-weave-alert");

const API_VERSIONS: [&str; 3] = ["1", "1.0", "1.1"];
const MAX_USERNAME_LEN: usize = 100;

/// Build the gateway router.
///
/// The specific routes are matched first; the router fallback and each
/// route's method fallback answer with the end-of-life response.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/{api}/{username}/info/collections",
            get(info::collections).fallback(eol::hard_eol),
        )
        .route(
            "/{api}/{username}/storage",
            delete(storage::delete_all).fallback(eol::hard_eol),
        )
        .route(
            "/{api}/{username}/storage/{collection}/{id}",
            get(storage::get_record)
                .put(storage::put_record)
                .fallback(eol::hard_eol),
        )
        .fallback(eol::hard_eol)
}

/// Build the full application: route table, request tracing, a global
/// concurrency limit, and `Cache-Control: no-store` on every response.
///
/// The limit is one semaphore shared by every route and the fallback.
pub fn build_router(state: Arc<AppState>, max_concurrency: usize) -> Router {
    let in_flight = max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
    router()
        .layer(TraceLayer::new_for_http())
        .layer(GlobalConcurrencyLimitLayer::new(in_flight))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

fn is_api_version(api: &str) -> bool {
    API_VERSIONS.contains(&api)
}

/// `[a-zA-Z0-9._-]{1,100}`
fn is_valid_username(username: &str) -> bool {
    (1..=MAX_USERNAME_LEN).contains(&username.len())
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// The partition (and, on record routes, the record) a request addresses.
///
/// Rejects with the end-of-life response when the api version or username
/// does not match, so those requests behave like any other unserved path.
#[derive(Debug)]
pub struct SyncTarget {
    /// Storage partition for this username and `Authorization` value.
    pub partition: Partition,
    /// Fixed record named by `{collection}/{id}`, if the route has one and
    /// it is a known record.
    pub record: Option<RecordName>,
}

impl FromRequestParts<Arc<AppState>> for SyncTarget {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Path(params)) =
            Path::<HashMap<String, String>>::from_request_parts(parts, state).await
        else {
            return Err(state.end_of_life());
        };

        let (Some(api), Some(username)) = (params.get("api"), params.get("username")) else {
            return Err(state.end_of_life());
        };
        if !is_api_version(api) || !is_valid_username(username) {
            return Err(state.end_of_life());
        }

        let record = match (params.get("collection"), params.get("id")) {
            (Some(collection), Some(id)) => RecordName::from_path(collection, id),
            _ => None,
        };

        // Non-UTF-8 values are hashed lossily, never folded into the
        // header-less partition.
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        Ok(Self {
            partition: state.store.partition(username, authorization.as_deref()),
            record,
        })
    }
}

/// A successful protocol response: JSON content type, `X-Weave-Timestamp`,
/// and `body`.
fn weave_ok(timestamp: i64, body: impl IntoResponse) -> Response {
    let stamp = HeaderValue::from(timestamp);
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ),
            (X_WEAVE_TIMESTAMP.clone(), stamp),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_versions() {
        assert!(is_api_version("1"));
        assert!(is_api_version("1.0"));
        assert!(is_api_version("1.1"));
        assert!(!is_api_version("1.5"));
        assert!(!is_api_version("2"));
        assert!(!is_api_version(""));
    }

    #[test]
    fn usernames() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("a.b_c-D9"));
        assert!(is_valid_username(&"x".repeat(100)));
        assert!(!is_valid_username(&"x".repeat(101)));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("al ice"));
        assert!(!is_valid_username("alice@example.com"));
        assert!(!is_valid_username("ålice"));
    }
}
