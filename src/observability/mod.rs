//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! rewrite engine / http server
//!     → logging.rs (tracing subscriber, stderr)
//!     → metrics.rs (decision counters, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the trace spans
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
