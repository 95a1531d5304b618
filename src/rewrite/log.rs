//! Decision log sinks.
//!
//! The engine writes one plain-text message per request. Any
//! `Fn(&str) + Send + Sync` closure can act as a sink.

/// Receives one message per decision.
pub trait RewriteLog: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> RewriteLog for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLog;

impl RewriteLog for NoopLog {
    fn log(&self, _message: &str) {}
}

/// Forwards messages to `tracing` at info level, target `spa_fallback::rewrite`.
///
/// Without an installed subscriber, or with a filter stricter than info for
/// that target, messages are dropped. The server binary installs a
/// subscriber writing to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl RewriteLog for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "spa_fallback::rewrite", "{}", message);
    }
}
