//! Fallback rewriting as an axum middleware.
//!
//! The middleware only ever changes the request URI. Every successful
//! decision, skip or rewrite, continues down the chain exactly once.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::rewrite::{RewriteEngine, RewriteError};

/// Shared, hot-swappable engine.
///
/// Requests read a snapshot without locking; a reload swaps the whole engine.
#[derive(Clone)]
pub struct EngineHandle(Arc<ArcSwap<RewriteEngine>>);

impl EngineHandle {
    pub fn new(engine: RewriteEngine) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(engine)))
    }

    /// Snapshot of the current engine.
    pub fn load(&self) -> Guard<Arc<RewriteEngine>> {
        self.0.load()
    }

    pub fn replace(&self, engine: RewriteEngine) {
        self.0.store(Arc::new(engine));
    }
}

impl From<RewriteEngine> for EngineHandle {
    fn from(engine: RewriteEngine) -> Self {
        Self::new(engine)
    }
}

/// Use with `axum::middleware::from_fn_with_state(handle, spa_fallback)`.
pub async fn spa_fallback(
    State(engine): State<EngineHandle>,
    mut req: Request,
    next: Next,
) -> Result<Response, RewriteError> {
    engine.load().apply(&mut req)?;
    Ok(next.run(req).await)
}
