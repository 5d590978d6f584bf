//! Feed and image proxy gateway library.

pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod image;
pub mod lifecycle;
pub mod mirrors;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
