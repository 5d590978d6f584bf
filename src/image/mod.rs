//! Image proxy subsystem.
//!
//! # Data Flow
//! ```text
//! /api/image?url=<target>
//!     → streamer.rs (validate scheme)
//!     → loop hop = 0..=5:
//!         referer.rs resolves Referer for the current URL
//!         GET (redirects disabled)
//!         3xx + Location → next URL, hop + 1
//!     → stream body with Content-Type / Content-Length / Cache-Control
//! ```

pub mod referer;
pub mod streamer;

pub use referer::resolve_referer;
pub use streamer::{ImageStreamer, UpstreamImage, MAX_REDIRECTS};
