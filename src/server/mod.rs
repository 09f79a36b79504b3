//! HTTP front door for the bundling pipeline.
//!
//! Routes:
//! - `GET /api/health` - liveness probe
//! - `POST /api/bundle` - `{ "text": ... }` or `{ "patents": [...] }` in, zip out
//!
//! Only the bundle route is rate limited. CORS admits the configured frontend
//! origin alone.

mod error;
pub mod rate_limit;
mod routes;

pub use error::{ApiError, ErrorBody, ServerError};
pub use rate_limit::{ClientRateLimiter, RateDecision, client_key};
pub use routes::{BundleRequest, HealthResponse, TOKENS_TRUNCATED_HEADER};

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::bundle::BundleService;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default allowed CORS origin.
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:5173";

/// Listener and policy settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Sole origin allowed by CORS.
    pub frontend_origin: String,
    /// Requests per client per window; 0 disables limiting.
    pub rate_limit_max: u32,
    /// Rate limit window.
    pub rate_limit_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            rate_limit_max: rate_limit::DEFAULT_MAX_REQUESTS,
            rate_limit_window: rate_limit::DEFAULT_WINDOW,
        }
    }
}

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The pipeline.
    pub service: Arc<BundleService>,
    /// Per-client request counter.
    pub limiter: Arc<ClientRateLimiter>,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub fn new(service: Arc<BundleService>, limiter: Arc<ClientRateLimiter>) -> Self {
        Self { service, limiter }
    }
}

/// Builds the router.
///
/// # Errors
///
/// Returns [`ServerError::InvalidOrigin`] if `frontend_origin` is not a valid
/// header value.
pub fn router(state: AppState, frontend_origin: &str) -> Result<Router, ServerError> {
    let origin =
        HeaderValue::from_str(frontend_origin).map_err(|_| ServerError::InvalidOrigin {
            origin: frontend_origin.to_string(),
        })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION, TOKENS_TRUNCATED_HEADER]);

    Ok(Router::new()
        .route("/api/bundle", post(routes::bundle))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::enforce_rate_limit,
        ))
        .route("/api/health", get(routes::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state))
}

/// Binds `config.bind:config.port` and serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError`] if the origin is invalid, binding fails, or the
/// accept loop fails.
pub async fn serve(
    config: &ServerConfig,
    service: Arc<BundleService>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let limiter = Arc::new(ClientRateLimiter::new(
        config.rate_limit_max,
        config.rate_limit_window,
    ));
    let app = router(AppState::new(service, limiter), &config.frontend_origin)?;

    let addr = SocketAddr::new(config.bind, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    serve_on(listener, app, shutdown).await
}

/// Serves `app` on an already-bound listener until `shutdown` resolves.
///
/// Peer addresses are attached so the rate limiter can key on them.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the accept loop fails.
pub async fn serve_on(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "listening");
    }
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(ServerError::Serve)?;
    info!("server stopped");
    Ok(())
}
