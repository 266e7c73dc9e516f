//! Endpoint pattern matching logic.
//!
//! # Responsibilities
//! - Canonicalize the request path (collapse duplicate slashes)
//! - Match method and path against a single endpoint pattern
//!
//! # Design Decisions
//! - Method comparison is exact
//! - Path comparison is exact and case-sensitive after canonicalization
//! - No regex, no globbing, no trailing-slash normalization

use std::borrow::Cow;

use axum::http::Method;

/// Named endpoints exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Public,
    Protected,
    Admin,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Public => "public",
            Endpoint::Protected => "protected",
            Endpoint::Admin => "admin",
        }
    }
}

/// A registered (method, path) pair and whether it needs a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPattern {
    pub endpoint: Endpoint,
    pub method: Method,
    pub path: &'static str,
    pub requires_auth: bool,
}

impl EndpointPattern {
    /// Returns true if `method` and the already canonical `path` match exactly.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.path == path
    }
}

/// Collapse runs of `/` into a single slash.
///
/// Borrows when the path is already canonical.
pub fn canonicalize_path(path: &str) -> Cow<'_, str> {
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }

    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    Cow::Owned(out)
}
