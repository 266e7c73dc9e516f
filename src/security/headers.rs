//! Security response headers.
//!
//! # Responsibilities
//! - Attach the fixed hardening headers to every response
//!
//! # Design Decisions
//! - Not configurable
//! - Runs outermost in the pipeline so error, preflight and panic responses
//!   carry the headers too
//! - Overrides any value set further down the pipeline

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// The hardening headers and their exact values.
pub const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("x-xss-protection", "0"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-frame-options", "deny"),
    ("x-content-type-options", "nosniff"),
    ("content-security-policy", "default-src 'self'; frame-ancestors 'none';"),
    ("cache-control", "no-cache, no-store, max-age=0, must-revalidate"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

/// Insert (or overwrite) every security header.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Middleware decorating every response with the security headers.
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}
