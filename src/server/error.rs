//! HTTP error bodies and server startup errors.

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::bundle::{BundleError, report_internal};
use crate::download::FailureDetail;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured frontend origin is not a valid header value.
    #[error("invalid frontend origin {origin:?}")]
    InvalidOrigin {
        /// The rejected origin.
        origin: String,
    },

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// JSON error body shared by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable summary.
    pub error: &'static str,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Per-token failures for `NO_PDFS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FailureDetail>>,
    /// Log correlation id for `INTERNAL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl ErrorBody {
    fn new(error: &'static str, code: &'static str) -> Self {
        Self {
            error,
            code,
            details: None,
            correlation_id: None,
        }
    }
}

/// A pipeline failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BundleError);

impl From<BundleError> for ApiError {
    fn from(error: BundleError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            BundleError::NoTokens => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new("No patent identifiers found.", "NO_TOKENS")),
            )
                .into_response(),
            BundleError::NoPdfs { details } => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    details: Some(details),
                    ..ErrorBody::new("No PDFs could be resolved.", "NO_PDFS")
                }),
            )
                .into_response(),
            BundleError::Internal { correlation_id } => internal_response(correlation_id),
            other => internal_response(report_internal(&other)),
        }
    }
}

fn internal_response(correlation_id: Uuid) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            correlation_id: Some(correlation_id),
            ..ErrorBody::new("Internal error", "INTERNAL")
        }),
    )
        .into_response()
}

/// `429` body with a whole-second `Retry-After` header.
pub(crate) fn rate_limited_response(retry_after: Duration) -> Response {
    let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody::new("Too many requests", "RATE_LIMITED")),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
    response
}
