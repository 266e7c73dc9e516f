//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the message handlers
//! - Wire up the middleware pipeline around it
//! - Bind to a listener and serve until shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::auth::{KeyCache, KeyFetchError, KeySource, RemoteKeySource, TokenValidator};
use crate::config::ServerConfig;
use crate::http::handlers::{self, AppState};
use crate::http::request::{make_request_span, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{panic_response, ApiError};
use crate::lifecycle::shutdown;
use crate::messages::{CannedMessages, MessageService};
use crate::observability::metrics;
use crate::routing::{PathMatcher, ADMIN_PATH, PROTECTED_PATH, PUBLIC_PATH};
use crate::security::access_control::{access_control_middleware, AccessControlState};
use crate::security::cors::{cors_middleware, CorsPolicy};
use crate::security::headers::security_headers_middleware;

/// Failures while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("key source: {0}")]
    KeySource(#[from] KeyFetchError),

    #[error("invalid CORS origin: {0}")]
    CorsOrigin(#[from] axum::http::header::InvalidHeaderValue),
}

/// HTTP server for the message API.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    keys: Arc<KeyCache>,
}

impl HttpServer {
    /// Create a server that fetches signing keys from the configured issuer.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let source = Arc::new(RemoteKeySource::new(&config.auth)?);
        Self::with_key_source(config, source)
    }

    /// Create a server with an explicit signing key source.
    pub fn with_key_source(
        config: ServerConfig,
        source: Arc<dyn KeySource>,
    ) -> Result<Self, ServerError> {
        Self::with_parts(config, source, Arc::new(CannedMessages))
    }

    /// Create a server with an explicit key source and message service.
    pub fn with_parts(
        config: ServerConfig,
        source: Arc<dyn KeySource>,
        messages: Arc<dyn MessageService>,
    ) -> Result<Self, ServerError> {
        let ttl = match config.auth.key_cache_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let keys = Arc::new(KeyCache::new(source, ttl).with_min_refetch_interval(
            Duration::from_secs(config.auth.key_refetch_min_interval_secs),
        ));

        let gate = AccessControlState {
            matcher: Arc::new(PathMatcher::messages_api()),
            validator: Arc::new(TokenValidator::new(&config.auth, keys.clone())),
        };
        let cors = Arc::new(CorsPolicy::new(&config.cors)?);

        let router = Self::build_router(&config, gate, cors, AppState { messages });
        Ok(Self {
            router,
            config,
            keys,
        })
    }

    /// Build the Axum router wrapped in the full middleware pipeline.
    ///
    /// The pipeline wraps the whole router rather than individual routes so
    /// that the gate sees unmatched requests and can canonicalize the path
    /// before routing.
    fn build_router(
        config: &ServerConfig,
        gate: AccessControlState,
        cors: Arc<CorsPolicy>,
        state: AppState,
    ) -> Router {
        let endpoints = Router::new()
            .route(PUBLIC_PATH, get(handlers::get_public))
            .route(PROTECTED_PATH, get(handlers::get_protected))
            .route(ADMIN_PATH, get(handlers::get_admin))
            .fallback(handlers::not_found)
            .with_state(state);

        let pipeline = ServiceBuilder::new()
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(middleware::from_fn(track_metrics))
            .layer(middleware::from_fn_with_state(
                Duration::from_secs(config.listener.request_timeout_secs),
                enforce_deadline,
            ))
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(middleware::from_fn_with_state(gate, access_control_middleware))
            .service(endpoints);

        Router::new().fallback_service(pipeline)
    }

    /// The fully assembled router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown receiver fires, then drain
    /// in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            issuer = %self.config.auth.issuer,
            audience = %self.config.auth.audience,
            "HTTP server starting"
        );

        let keys = self.keys.clone();
        tokio::spawn(async move {
            match keys.refresh().await {
                Ok(()) => tracing::info!(keys = keys.len(), "Signing keys loaded"),
                Err(e) => tracing::warn!(error = %e, "Initial signing key fetch failed"),
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait_for(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Bound the whole downstream pipeline by the request deadline. A request
/// that overruns is answered with an internal error, not a bare 408.
async fn enforce_deadline(
    State(deadline): State<Duration>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(deadline = ?deadline, "Request deadline exceeded");
            ApiError::Internal("Request timed out".to_string()).into_response()
        }
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
