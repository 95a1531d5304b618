//! Single-page-application history fallback for axum.
//!
//! GET requests from HTML-accepting clients for paths that do not look like
//! static assets are rewritten to the application's entry document, so the
//! client-side router can take over. Custom regex rules take precedence.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;

pub use config::AppConfig;
pub use http::{spa_fallback, EngineHandle, HttpServer};
pub use lifecycle::Shutdown;
pub use rewrite::{Decision, RewriteEngine, RewriteError, RewriteOptions, RewriteTarget, Rule};
