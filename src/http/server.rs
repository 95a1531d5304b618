//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router serving the application directory
//! - Wire up middleware (request ID, tracing, timeout, fallback rewrite)
//! - Bind server to listener
//! - Swap rewrite rules on configuration reload

use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::middleware::{spa_fallback, EngineHandle};
use crate::http::request::{request_span, MakeRequestUuid};
use crate::rewrite::RewriteEngine;

/// Static file server for a single-page application.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    engine: EngineHandle,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, regex::Error> {
        let engine = EngineHandle::new(RewriteEngine::from_config(&config.fallback)?);
        let router = Self::build_router(&config, engine.clone());

        Ok(Self {
            router,
            config,
            engine,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, engine: EngineHandle) -> Router {
        Router::new()
            .fallback_service(ServeDir::new(&config.server.root))
            .layer(middleware::from_fn_with_state(engine, spa_fallback))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.server.request_timeout_secs,
                    )))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, e.g. for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the rewrite rules;
    /// server settings only take effect on restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            root = ?self.config.server.root,
            rules = self.config.fallback.rewrites.len(),
            "HTTP server starting"
        );

        let engine = self.engine.clone();
        let server_config = self.config.server.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.server.bind_address != server_config.bind_address
                    || config.server.root != server_config.root
                {
                    tracing::warn!("Server settings changed; restart to apply them");
                }

                match RewriteEngine::from_config(&config.fallback) {
                    Ok(new_engine) => {
                        tracing::info!(
                            rules = new_engine.rules().len(),
                            index = %new_engine.index(),
                            "Rewrite rules reloaded"
                        );
                        engine.replace(new_engine);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected reloaded rewrite rules");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
