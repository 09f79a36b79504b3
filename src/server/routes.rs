//! Route handlers.

use std::net::SocketAddr;
use std::time::SystemTime;

use axum::Json;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::AppState;
use super::error::{ApiError, rate_limited_response};
use super::rate_limit::{RateDecision, client_key};
use crate::user_agent::SERVICE_NAME;

/// Response header reporting whether the token list was capped.
pub const TOKENS_TRUNCATED_HEADER: HeaderName = HeaderName::from_static("x-tokens-truncated");

/// `POST /api/bundle` body.
///
/// A non-empty `patents` array wins over `text`; its entries are joined with
/// newlines.
#[derive(Debug, Default, Deserialize)]
pub struct BundleRequest {
    /// Free-form text containing identifiers.
    #[serde(default)]
    pub text: Option<String>,
    /// Identifiers, one per entry.
    #[serde(default)]
    pub patents: Option<Vec<String>>,
}

impl BundleRequest {
    /// Text handed to the pipeline.
    #[must_use]
    pub fn input_text(&self) -> String {
        match &self.patents {
            Some(patents) if !patents.is_empty() => patents.join("\n"),
            _ => self.text.clone().unwrap_or_default(),
        }
    }
}

/// `GET /api/health` body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always true.
    pub ok: bool,
    /// Service name.
    pub service: &'static str,
    /// Current time as an HTTP-date.
    pub time: String,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME,
        time: httpdate::fmt_http_date(SystemTime::now()),
    })
}

/// POST /api/bundle
pub async fn bundle(
    State(state): State<AppState>,
    Json(request): Json<BundleRequest>,
) -> Result<Response, ApiError> {
    let text = request.input_text();
    let prepared = state.service.prepare(&text).await?;

    let file_name = prepared.file_name().to_string();
    let truncated = prepared.truncated();
    info!(
        file_name = %file_name,
        documents = prepared.summary().document_entries.len(),
        truncated,
        "streaming bundle"
    );
    let stream = prepared.into_stream().await?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
        (header::CACHE_CONTROL, "no-store".to_string()),
        (TOKENS_TRUNCATED_HEADER, truncated.to_string()),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Rejects requests from clients over their window budget.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    match state.limiter.check(&key) {
        RateDecision::Allowed { remaining } => {
            debug!(client = %key, remaining, "request admitted");
            next.run(request).await
        }
        RateDecision::Limited { retry_after } => {
            info!(client = %key, retry_after_secs = retry_after.as_secs(), "request rate limited");
            rate_limited_response(retry_after)
        }
    }
}
