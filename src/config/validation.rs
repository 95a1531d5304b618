//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts and the fallback index
//! - Compile every rewrite pattern once so bad regexes fail at load
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Rewrite targets are not checked here; an unusable target is reported
//!   when a request first matches its rule

use std::net::SocketAddr;

use regex::Regex;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("fallback.index must be an absolute path, got `{0}`")]
    RelativeIndex(String),

    #[error("fallback.rewrites[{index}]: invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        reason: String,
    },
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if !config.fallback.index.starts_with('/') {
        errors.push(ValidationError::RelativeIndex(config.fallback.index.clone()));
    }

    for (index, rule) in config.fallback.rewrites.iter().enumerate() {
        if let Err(e) = Regex::new(&rule.from) {
            errors.push(ValidationError::InvalidPattern {
                index,
                pattern: rule.from.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
