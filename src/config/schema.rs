//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the resource server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, request deadline).
    pub listener: ListenerConfig,

    /// Bearer token verification settings.
    pub auth: AuthConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:6060").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6060".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URI tokens must name in `iss` (e.g., "https://tenant.auth0.com/").
    pub issuer: String,

    /// Audience value that must appear in the token's `aud` claim.
    pub audience: String,

    /// JWKS endpoint. Discovered from the issuer when absent.
    pub jwks_uri: Option<String>,

    /// Accepted JWS algorithms.
    pub algorithms: Vec<String>,

    /// Clock skew tolerance applied to `exp` and `nbf`, in seconds.
    pub leeway_secs: u64,

    /// Upper bound on a single key set fetch, in seconds.
    pub key_fetch_timeout_secs: u64,

    /// Age after which cached keys are refreshed. 0 keeps them until a key-id miss.
    pub key_cache_ttl_secs: u64,

    /// Minimum seconds between refetches triggered by unknown key ids.
    pub key_refetch_min_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            jwks_uri: None,
            algorithms: vec!["RS256".to_string()],
            leeway_secs: 60,
            key_fetch_timeout_secs: 5,
            key_cache_ttl_secs: 3600,
            key_refetch_min_interval_secs: 10,
        }
    }
}

/// CORS configuration.
///
/// Only the origin is configurable; headers, methods and max-age are fixed
/// by [`crate::security::cors::CorsPolicy`].
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// The single origin allowed to call the API from a browser.
    pub allowed_origin: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
