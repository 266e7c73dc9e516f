//! Endpoint table and lookup.
//!
//! # Responsibilities
//! - Hold the statically built endpoint table
//! - Look up the pattern matching a request method and path
//! - Return matched pattern or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan; the table has three entries
//! - Explicit no-match (reported as not-found) rather than silent default

use axum::http::Method;

use crate::routing::matcher::{canonicalize_path, Endpoint, EndpointPattern};

pub const PUBLIC_PATH: &str = "/api/messages/public";
pub const PROTECTED_PATH: &str = "/api/messages/protected";
pub const ADMIN_PATH: &str = "/api/messages/admin";

/// Classifies requests against the registered endpoint patterns.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<EndpointPattern>,
}

impl PathMatcher {
    /// Build a matcher over an explicit, ordered pattern list.
    pub fn new(patterns: Vec<EndpointPattern>) -> Self {
        Self { patterns }
    }

    /// The message API: one public endpoint and two that require a token.
    pub fn messages_api() -> Self {
        Self::new(vec![
            EndpointPattern {
                endpoint: Endpoint::Public,
                method: Method::GET,
                path: PUBLIC_PATH,
                requires_auth: false,
            },
            EndpointPattern {
                endpoint: Endpoint::Protected,
                method: Method::GET,
                path: PROTECTED_PATH,
                requires_auth: true,
            },
            EndpointPattern {
                endpoint: Endpoint::Admin,
                method: Method::GET,
                path: ADMIN_PATH,
                requires_auth: true,
            },
        ])
    }

    /// First pattern matching `method` and the canonical form of `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&EndpointPattern> {
        let path = canonicalize_path(path);
        self.patterns.iter().find(|p| p.matches(method, &path))
    }

    pub fn patterns(&self) -> &[EndpointPattern] {
        &self.patterns
    }
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::messages_api()
    }
}
