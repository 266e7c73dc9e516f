//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware pipeline)
//!     → request.rs (request ID, request span)
//!     → [security: headers, CORS, authorization gate]
//!     → handlers.rs (message endpoints)
//!     → response.rs (uniform JSON errors)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use handlers::AppState;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{ApiError, ErrorMessage};
pub use server::{HttpServer, ServerError};
