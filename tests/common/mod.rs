//! Shared utilities for integration testing.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use spa_fallback::config::AppConfig;
use spa_fallback::{HttpServer, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const INDEX_HTML: &str = "<!doctype html><div id=\"app\"></div>";
pub const ADMIN_HTML: &str = "<!doctype html><div id=\"admin\"></div>";
pub const APP_JS: &str = "console.log('app')";

/// Write a small built application into a fresh temporary directory.
#[allow(dead_code)]
pub fn create_site(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "spa-fallback-{}-{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("index.html"), INDEX_HTML).unwrap();
    fs::write(root.join("admin.html"), ADMIN_HTML).unwrap();
    fs::write(root.join("assets").join("app.js"), APP_JS).unwrap();
    root
}

/// A running server plus the handles a test needs to drive it.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<AppConfig>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        updates,
        shutdown,
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
