//! Error responses.
//!
//! A rewrite error halts the request before it reaches the file server and
//! becomes a 500 here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::rewrite::RewriteError;

impl IntoResponse for RewriteError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Rewrite failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
