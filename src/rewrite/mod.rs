//! Rewrite decision subsystem.
//!
//! # Data Flow
//! ```text
//! FallbackConfig (or RewriteOptions built in code)
//!     → rule.rs (compile patterns, resolve targets)
//!     → engine.rs (immutable RewriteEngine)
//!
//! Per request:
//!     method / Accept checks (accept.rs)
//!     → first matching rule, or index unless the path looks like an asset
//!     → one message to the configured sink (log.rs)
//! ```

pub mod accept;
pub mod engine;
pub mod log;
pub mod rule;

pub use engine::{
    Decision, RewriteEngine, RewriteError, RewriteOptions, RewrittenFrom, SkipReason,
    DEFAULT_INDEX,
};
pub use log::{NoopLog, RewriteLog, TracingLog};
pub use rule::{RewriteContext, RewriteTarget, Rule};
