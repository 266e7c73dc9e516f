//! Bearer token verification subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → claims.rs (split, decode, parse header + payload)
//!     → keys.rs (resolve signing key by kid; fetch on miss / TTL expiry)
//!         → source.rs (discovery document → JWKS over HTTP, bounded)
//!     → validator.rs (verify signature, then expiry → issuer → audience)
//!     → ValidationOutcome
//! ```
//!
//! # Design Decisions
//! - This server only verifies tokens; it never issues or refreshes them
//! - No claim is trusted before the signature has been verified
//! - The key cache is the only shared mutable state in the request path

pub mod claims;
pub mod keys;
pub mod source;
pub mod validator;

pub use claims::TokenClaims;
pub use keys::{KeyCache, KeyCacheError, SigningKey};
pub use source::{KeyFetchError, KeySource, RemoteKeySource};
pub use validator::{ClaimCheck, TokenValidator, ValidationOutcome};
