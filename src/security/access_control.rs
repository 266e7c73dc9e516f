//! Authorization gate.
//!
//! Classifies each request against the [`PathMatcher`] and decides whether it
//! reaches a handler. Public endpoints pass through; protected and admin
//! endpoints require a bearer token that the [`TokenValidator`] accepts.

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::PathAndQuery, HeaderMap, Method, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{TokenClaims, TokenValidator, ValidationOutcome};
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::routing::{matcher::canonicalize_path, PathMatcher};

/// State required for the authorization gate.
#[derive(Clone)]
pub struct AccessControlState {
    pub matcher: Arc<PathMatcher>,
    pub validator: Arc<TokenValidator>,
}

/// Decision taken for one request.
#[derive(Debug)]
pub enum GateOutcome {
    /// Forward to the handler, with the verified claims for protected endpoints.
    ProceedToHandler(Option<TokenClaims>),
    NotFound,
    /// `token_rejected` is false when no usable bearer token was presented.
    Unauthorized { token_rejected: bool },
}

impl GateOutcome {
    fn label(&self) -> &'static str {
        match self {
            GateOutcome::ProceedToHandler(None) => "public",
            GateOutcome::ProceedToHandler(Some(_)) => "authorized",
            GateOutcome::NotFound => "not_found",
            GateOutcome::Unauthorized { token_rejected: false } => "missing_token",
            GateOutcome::Unauthorized { token_rejected: true } => "rejected_token",
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Returns `None` for a missing
/// header, another scheme, or an empty token.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Decide the fate of a request whose path has already been canonicalized.
///
/// Takes the request parts rather than the request: the body is not `Sync`,
/// so holding `&Request<Body>` across the validation await would make the
/// middleware future `!Send`.
pub async fn authorize(
    state: &AccessControlState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> GateOutcome {
    let Some(pattern) = state.matcher.match_route(method, path) else {
        return GateOutcome::NotFound;
    };

    if !pattern.requires_auth {
        return GateOutcome::ProceedToHandler(None);
    }

    let Some(token) = extract_bearer(headers) else {
        return GateOutcome::Unauthorized { token_rejected: false };
    };

    match state.validator.validate(token).await {
        ValidationOutcome::Valid(claims) => GateOutcome::ProceedToHandler(Some(claims)),
        rejected => {
            tracing::debug!(
                endpoint = pattern.endpoint.as_str(),
                reason = rejected.as_str(),
                "Bearer token rejected"
            );
            GateOutcome::Unauthorized { token_rejected: true }
        }
    }
}

/// Rewrite the request URI so its path is canonical. Returns `None` when the
/// path is already canonical.
fn canonical_uri(uri: &Uri) -> Option<Uri> {
    let path = canonicalize_path(uri.path());
    if path == uri.path() {
        return None;
    }

    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.into_owned(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

pub async fn access_control_middleware(
    State(state): State<AccessControlState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(uri) = canonical_uri(req.uri()) {
        tracing::debug!(original = %req.uri(), canonical = %uri, "Canonicalized request path");
        *req.uri_mut() = uri;
    }

    let outcome = authorize(&state, req.method(), req.uri().path(), req.headers()).await;
    metrics::record_auth_decision(outcome.label());

    match outcome {
        GateOutcome::ProceedToHandler(claims) => {
            if let Some(claims) = claims {
                req.extensions_mut().insert(claims);
            }
            next.run(req).await
        }
        GateOutcome::NotFound => ApiError::NotFound.into_response(),
        GateOutcome::Unauthorized { token_rejected } => {
            ApiError::Unauthorized { token_rejected }.into_response()
        }
    }
}
