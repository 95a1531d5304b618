//! SPA static file server.
//!
//! ```text
//!  client ──▶ request id ──▶ trace ──▶ timeout ──▶ spa_fallback ──▶ ServeDir(root)
//!                                                    │
//!                                    GET + HTML + no dot → /index.html
//! ```

use std::path::PathBuf;

use clap::{Args, Parser};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use spa_fallback::config::{load_config, validation::validate_config, AppConfig, ConfigError};
use spa_fallback::config::watcher::ConfigWatcher;
use spa_fallback::lifecycle::{wait_for_shutdown, Shutdown};
use spa_fallback::observability::{logging::init_logging, metrics::init_metrics};
use spa_fallback::HttpServer;

#[derive(Parser)]
#[command(name = "spa-fallback")]
#[command(version, about = "Serve a single-page application with history fallback", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload rewrite rules when the configuration file changes
    #[arg(long, requires = "config")]
    watch: bool,

    #[command(flatten)]
    overrides: Overrides,
}

/// Settings that take precedence over the configuration file.
#[derive(Args, Clone)]
struct Overrides {
    /// Directory to serve
    #[arg(long)]
    root: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Fallback document
    #[arg(long)]
    index: Option<String>,

    /// Log every rewrite decision
    #[arg(short, long)]
    verbose: bool,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(root) = &self.root {
            config.server.root = root.clone();
        }
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(index) = &self.index {
            config.fallback.index = index.clone();
        }
        if self.verbose {
            config.fallback.verbose = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    cli.overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.server.bind_address,
        root = ?config.server.root,
        index = %config.fallback.index,
        rules = config.fallback.rewrites.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Reloaded configs pass through the CLI overrides before reaching the server.
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, mut raw_updates) = ConfigWatcher::new(path);
            let overrides = cli.overrides.clone();
            tokio::spawn(async move {
                while let Some(mut config) = raw_updates.recv().await {
                    overrides.apply(&mut config);
                    if updates_tx.send(config).is_err() {
                        break;
                    }
                }
            });
            Some(watcher.run()?)
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, updates_rx, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
