//! Hot reload of the rewrite rules.
//!
//! # Design Decisions
//! - Only validated configurations are forwarded; a bad edit keeps the
//!   running rules and every problem in it is logged on its own line
//! - Polling fallback every 2s for filesystems without native events

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::AppConfig;

/// Watches one config file and forwards each valid revision.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload(&watched, &update_tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and forward it if valid. Returns whether a config was sent.
fn reload(path: &Path, tx: &mpsc::UnboundedSender<AppConfig>) -> bool {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(
                path = ?path,
                rules = config.fallback.rewrites.len(),
                "Config file changed, forwarding new rules"
            );
            tx.send(config).is_ok()
        }
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                tracing::error!(path = ?path, %error, "Rejected config change");
            }
            false
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current rules");
            false
        }
    }
}
