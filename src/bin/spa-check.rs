//! Evaluate a single request target against a configuration, offline.
//!
//! ```text
//! $ spa-check --config spa.toml /users/42
//! {
//!   "outcome": "rewrite",
//!   "target": "/user-profile?id=42",
//!   "rule": 1
//! }
//! ```

use std::path::PathBuf;

use axum::http::{header::ACCEPT, HeaderMap, HeaderValue, Method, Uri};
use clap::Parser;

use spa_fallback::config::{load_config, AppConfig};
use spa_fallback::{Decision, RewriteEngine};

#[derive(Parser)]
#[command(name = "spa-check")]
#[command(about = "Show how the fallback rules treat a request", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request method
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Accept header, empty to omit it
    #[arg(short, long, default_value = "text/html")]
    accept: String,

    /// Request target, e.g. `/users/42?tab=posts`
    target: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    let decision = check(&config, &cli.method, &cli.accept, &cli.target)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}

/// Evaluate one request the way the server would, without touching it.
fn check(
    config: &AppConfig,
    method: &str,
    accept: &str,
    target: &str,
) -> Result<Decision, Box<dyn std::error::Error>> {
    let engine = RewriteEngine::from_config(&config.fallback)?;

    let method = Method::from_bytes(method.as_bytes())?;
    let uri: Uri = target
        .parse()
        .map_err(|e| format!("invalid request target `{}`: {}", target, e))?;

    let mut headers = HeaderMap::new();
    if !accept.is_empty() {
        headers.insert(ACCEPT, HeaderValue::from_str(accept)?);
    }

    Ok(engine.decide(&method, &headers, &uri)?)
}
