//! Feed retrieval and rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! concrete feed URL
//!     → fetcher.rs (GET with spoofed headers, raw bytes fully buffered, final URL)
//!     → rewriter.rs (byte-level, origin taken from the final URL)
//!         → rules.rs RELATIVE_FIXUP  (src=/a.png → src=https://origin/a.png)
//!         → rules.rs RESOURCE_PROXY  (image URLs → {server}/api/image?url=...)
//!     → rewritten body, upstream Content-Type
//! ```

pub mod fetcher;
pub mod rewriter;
pub mod rules;

pub use fetcher::{FeedFetcher, FetchedFeed};
pub use rewriter::{ContentRewriter, RewriteContext, PROXY_ENDPOINT};
