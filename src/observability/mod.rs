//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! handlers / mirror probe / image streamer
//!     → logging.rs (tracing events, pretty or JSON on stdout)
//!     → metrics.rs (gateway_* counters, histogram, active mirror gauge)
//!
//! Prometheus scrapes metrics_address when metrics_enabled is set
//! ```
//!
//! # Design Decisions
//! - Every request runs inside a span carrying its request ID
//! - Metric macros are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
