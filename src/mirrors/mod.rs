//! Feed mirror subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (probe.rs):
//!     candidates in priority order
//!     → HEAD probe each (short timeout)
//!     → first success, else default
//!     → resolver.rs publishes active mirror (atomic swap)
//!
//! Per request (resolver.rs):
//!     rsshub://platform/path → {active}/platform/path
//!     http(s)://...          → unchanged
//! ```

pub mod probe;
pub mod resolver;

pub use probe::MirrorProbe;
pub use resolver::{MirrorBackend, MirrorResolver, ABSTRACT_SCHEME};
