//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (hardening headers on the way out)
//!     → cors.rs (answer preflight, tag allowed-origin responses)
//!     → access_control.rs (canonicalize path, match endpoint, verify bearer token)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: a protected endpoint without a valid token never reaches a handler
//! - No trust in client input
//! - Every response, including errors, carries the security headers

pub mod access_control;
pub mod cors;
pub mod headers;

pub use access_control::{AccessControlState, GateOutcome};
pub use cors::CorsPolicy;
pub use headers::SECURITY_HEADERS;
