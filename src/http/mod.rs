//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID, trace span)
//!     → middleware.rs (fallback rewrite of the URI)
//!     → ServeDir (static files, index for rewritten paths)
//!     → response.rs (rewrite errors as 500)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{spa_fallback, EngineHandle};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
