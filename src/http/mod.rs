//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → cors.rs (answer OPTIONS with 204, add Allow-Origin)
//!     → request.rs (request ID) + trace span
//!     → server.rs (route table)
//!         → auth.rs (bearer gate on /api/rss, /api/subscribe)
//!         → handlers.rs
//!             feed:  mirrors → feed fetcher → rewriter
//!             image: image streamer (streamed body)
//!     → error JSON via crate::error on failure
//! ```

pub mod auth;
pub mod cors;
pub mod handlers;
pub mod query;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
