//! Endpoint handlers.
//!
//! Handlers run only after the authorization gate has let the request
//! through, so they never inspect credentials themselves.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::auth::TokenClaims;
use crate::http::response::ApiError;
use crate::messages::{Message, MessageService};
use crate::routing::Endpoint;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<dyn MessageService>,
}

fn respond(state: &AppState, endpoint: Endpoint) -> Result<Json<Message>, ApiError> {
    state
        .messages
        .message(endpoint)
        .map(Json)
        .map_err(|e| {
            tracing::error!(endpoint = endpoint.as_str(), error = %e, "Message service failed");
            ApiError::Internal(e.to_string())
        })
}

pub async fn get_public(State(state): State<AppState>) -> Result<Json<Message>, ApiError> {
    respond(&state, Endpoint::Public)
}

pub async fn get_protected(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<Message>, ApiError> {
    tracing::debug!(subject = ?claims.subject, "Serving protected message");
    respond(&state, Endpoint::Protected)
}

pub async fn get_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<Message>, ApiError> {
    tracing::debug!(subject = ?claims.subject, "Serving admin message");
    respond(&state, Endpoint::Admin)
}

/// Fallback for anything the gate let through that has no handler.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
