//! Error responses.
//!
//! # Responsibilities
//! - Map terminal outcomes (not-found, unauthorized, internal) to a status code
//! - Render the uniform `{"text": ...}` JSON error body
//! - Turn panics caught in the pipeline into internal errors
//!
//! # Design Decisions
//! - Every error body is built fresh per response
//! - All authentication failures collapse to one wire-visible 401
//! - Internal errors expose only the failure's own message text

use std::any::Any;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The wire-visible error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub text: String,
}

impl ErrorMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Terminal failures of the request pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No registered endpoint matches the request.
    #[error("Not Found")]
    NotFound,

    /// A protected endpoint was called without an acceptable bearer token.
    /// `token_rejected` is set when a token was presented but failed validation.
    #[error("Requires authentication")]
    Unauthorized { token_rejected: bool },

    /// Unexpected failure in a handler or in infrastructure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(ErrorMessage::new(self.to_string()))).into_response();

        if let ApiError::Unauthorized { token_rejected } = self {
            let challenge = if token_rejected {
                HeaderValue::from_static("Bearer error=\"invalid_token\"")
            } else {
                HeaderValue::from_static("Bearer")
            };
            response.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
        }

        response
    }
}

/// Render a panic payload caught by the pipeline as a 500 response.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal Server Error".to_string()
    };

    tracing::error!(panic = %message, "Request handler panicked");
    ApiError::Internal(message).into_response()
}
