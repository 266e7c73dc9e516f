//! Cross-origin resource sharing policy.
//!
//! # Responsibilities
//! - Answer preflight (`OPTIONS`) requests from the allowed origin
//! - Attach `Access-Control-Allow-Origin` to responses for the allowed origin
//! - Mark every non-preflight response as varying by `Origin` so shared caches
//!   never replay one origin's response to another
//!
//! # Design Decisions
//! - Exactly one configured origin; never a wildcard
//! - Allowed headers, methods and max-age are fixed
//! - Disallowed origins get no CORS headers at all; the browser enforces the denial

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;

pub const ALLOWED_HEADERS: &str = "Authorization, Content-Type";
pub const ALLOWED_METHODS: &str = "GET";
pub const MAX_AGE_SECS: u64 = 86_400;

/// Immutable CORS policy built once at startup.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origin: HeaderValue,
}

impl CorsPolicy {
    /// Build the policy. The origin must already have passed config validation.
    pub fn new(config: &CorsConfig) -> Result<Self, axum::http::header::InvalidHeaderValue> {
        Ok(Self {
            allowed_origin: HeaderValue::from_str(config.allowed_origin.trim())?,
        })
    }

    pub fn allowed_origin(&self) -> &HeaderValue {
        &self.allowed_origin
    }

    /// Returns true if the request's `Origin` is the configured origin.
    pub fn is_allowed(&self, headers: &HeaderMap) -> bool {
        headers.get(header::ORIGIN) == Some(&self.allowed_origin)
    }

    /// Response to a preflight from the allowed origin.
    pub fn preflight_response(&self) -> Response {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(MAX_AGE_SECS));
        headers.insert(
            header::VARY,
            HeaderValue::from_static(
                "Origin, Access-Control-Request-Method, Access-Control-Request-Headers",
            ),
        );
        response
    }

    /// Decorate an actual (non-preflight) response for the allowed origin.
    pub fn annotate(&self, response: &mut Response) {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone());
    }
}

fn is_preflight(request: &Request<Body>) -> bool {
    request.method() == Method::OPTIONS && request.headers().contains_key(header::ORIGIN)
}

/// Middleware applying the CORS policy.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let allowed = policy.is_allowed(request.headers());

    if is_preflight(&request) {
        if allowed {
            return policy.preflight_response();
        }
        tracing::debug!(
            origin = ?request.headers().get(header::ORIGIN),
            "Preflight from disallowed origin"
        );
        return vary_by_origin(next.run(request).await);
    }

    let mut response = next.run(request).await;
    if allowed {
        policy.annotate(&mut response);
    }
    vary_by_origin(response)
}

fn vary_by_origin(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Origin"));
    response
}
