//! Resource server library: bearer-token protected message API.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod messages;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
