//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rewrite::DEFAULT_INDEX;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Static file server settings.
    pub server: ServerConfig,

    /// Single-page-app fallback rewriting.
    pub fallback: FallbackConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Static file server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Directory the built application is served from.
    pub root: PathBuf,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            root: PathBuf::from("dist"),
            request_timeout_secs: 30,
        }
    }
}

/// Fallback rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Custom rewrites, first match wins.
    pub rewrites: Vec<RewriteConfig>,

    /// Path substituted when no rule matches.
    pub index: String,

    /// Log every decision at info level.
    pub verbose: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            rewrites: Vec::new(),
            index: DEFAULT_INDEX.to_string(),
            verbose: false,
        }
    }
}

/// A configured rewrite rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteConfig {
    /// Regular expression searched in the request path.
    pub from: String,

    /// Rewrite target.
    pub to: TargetConfig,
}

/// Rewrite target as written in the config file.
///
/// Anything other than a string or a `{ template = "..." }` table is
/// accepted here and rejected when a request first matches the rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TargetConfig {
    /// Literal path, e.g. `to = "/admin.html"`.
    Path(String),

    /// Capture expansion, e.g. `to = { template = "/user?id=$1" }`.
    Template { template: String },

    Other(toml::Value),
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "spa_fallback=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
