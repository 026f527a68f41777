//! HTTP error types for the gateway.
//!
//! Maps domain errors from `synceol-core` into the legacy protocol's
//! responses. Most of these are not failures from the client's point of
//! view: a missing record is a plain 404 and the end-of-life signal is the
//! expected answer for everything the gateway no longer serves.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use synceol_core::RecordError;

use crate::routes::X_WEAVE_ALERT;

/// Non-standard status the legacy clients recognise as "service EOL".
pub const SERVICE_EOL: u16 = 513;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// The route is no longer served. Carries the rendered alert header.
    EndOfLife(HeaderValue),
    /// A write body was not a JSON object.
    MalformedBody,
    /// The requested record does not exist.
    NotFound,
    /// Cache failure or corrupt cached data.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn json_content_type() -> (header::HeaderName, HeaderValue) {
    (
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::EndOfLife(alert) => {
                let status =
                    StatusCode::from_u16(SERVICE_EOL).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
                (
                    status,
                    [json_content_type(), (X_WEAVE_ALERT.clone(), alert)],
                    "0",
                )
                    .into_response()
            }
            Self::MalformedBody => {
                (StatusCode::BAD_REQUEST, [json_content_type()], "0").into_response()
            }
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Internal(message) => {
                error!(error = %message, "request failed");
                let body = ErrorBody {
                    error: "internal_error",
                    message,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
        }
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Malformed { .. } => Self::MalformedBody,
            RecordError::Corrupt { .. } | RecordError::Encode { .. } | RecordError::Cache(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
