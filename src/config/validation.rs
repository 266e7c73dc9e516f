//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, socket addresses and value ranges
//! - Reject origins and algorithms that would weaken the security policy
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderValue;
use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    let auth = &config.auth;
    if let Err(message) = check_http_url(&auth.issuer) {
        errors.push(ValidationError::new("auth.issuer", message));
    }
    if auth.audience.trim().is_empty() {
        errors.push(ValidationError::new("auth.audience", "must not be empty"));
    }
    if let Some(jwks_uri) = &auth.jwks_uri {
        if let Err(message) = check_http_url(jwks_uri) {
            errors.push(ValidationError::new("auth.jwks_uri", message));
        }
    }
    if auth.algorithms.is_empty() {
        errors.push(ValidationError::new("auth.algorithms", "at least one algorithm is required"));
    }
    for alg in &auth.algorithms {
        match Algorithm::from_str(alg) {
            Ok(Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => {
                errors.push(ValidationError::new(
                    "auth.algorithms",
                    format!("{alg} is symmetric; only public-key algorithms are accepted"),
                ));
            }
            Ok(_) => {}
            Err(_) => {
                errors.push(ValidationError::new(
                    "auth.algorithms",
                    format!("unsupported algorithm '{alg}'"),
                ));
            }
        }
    }
    if auth.key_fetch_timeout_secs == 0 {
        errors.push(ValidationError::new("auth.key_fetch_timeout_secs", "must be > 0"));
    } else if config.listener.request_timeout_secs <= auth.key_fetch_timeout_secs {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            format!(
                "must exceed auth.key_fetch_timeout_secs ({})",
                auth.key_fetch_timeout_secs
            ),
        ));
    }

    let origin = config.cors.allowed_origin.trim();
    if origin.is_empty() {
        errors.push(ValidationError::new("cors.allowed_origin", "must not be empty"));
    } else if origin == "*" {
        errors.push(ValidationError::new(
            "cors.allowed_origin",
            "wildcard origins are not allowed",
        ));
    } else if HeaderValue::from_str(origin).is_err() {
        errors.push(ValidationError::new(
            "cors.allowed_origin",
            "not a valid header value",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    let url = url::Url::parse(raw).map_err(|e| format!("'{raw}' is not a URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.issuer = "https://tenant.example.com/".into();
        config.auth.audience = "https://api.example.com".into();
        config.cors.allowed_origin = "http://localhost:4040".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_default_config_reports_every_missing_field() {
        let errors = validate_config(&ServerConfig::default()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"auth.issuer"));
        assert!(fields.contains(&"auth.audience"));
        assert!(fields.contains(&"cors.allowed_origin"));
    }

    #[test]
    fn test_rejects_wildcard_origin() {
        let mut config = valid_config();
        config.cors.allowed_origin = "*".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cors.allowed_origin");
    }

    #[test]
    fn test_rejects_symmetric_and_unknown_algorithms() {
        let mut config = valid_config();
        config.auth.algorithms = vec!["HS256".into(), "none".into(), "ES256".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.field == "auth.algorithms"));
    }

    #[test]
    fn test_rejects_non_http_issuer() {
        let mut config = valid_config();
        config.auth.issuer = "ftp://tenant.example.com/".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "auth.issuer");
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let mut config = valid_config();
        config.listener.bind_address = "localhost".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "listener.bind_address");
    }

    #[test]
    fn test_request_deadline_must_outlast_key_fetch() {
        let mut config = valid_config();
        config.listener.request_timeout_secs = 1;
        config.auth.key_fetch_timeout_secs = 5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "listener.request_timeout_secs");

        config.listener.request_timeout_secs = 5;
        assert!(validate_config(&config).is_err());

        config.listener.request_timeout_secs = 6;
        assert!(validate_config(&config).is_ok());
    }
}
