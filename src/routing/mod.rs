//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (endpoint table lookup)
//!     → matcher.rs (canonicalize, evaluate method + path)
//!     → Return: matched EndpointPattern or no-match (not-found)
//!
//! Table construction (at startup):
//!     PathMatcher::messages_api()
//!     → flat, ordered list of EndpointPattern
//!     → frozen, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Table built at startup, immutable at runtime
//! - No regex (exact comparison only)
//! - Deterministic: same input always matches same pattern
//! - First match wins (table order)

pub mod matcher;
pub mod router;

pub use matcher::{Endpoint, EndpointPattern};
pub use router::{PathMatcher, ADMIN_PATH, PROTECTED_PATH, PUBLIC_PATH};
