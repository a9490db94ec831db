//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0)
//! - Check addresses and the backend URL parse
//! - Check that extra routes name a real operation and a valid template
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Duplicate routes are detected later, when the route table is built

use axum::http::Method;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::{OperationId, Pattern};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }

    match url::Url::parse(&config.backend.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
        Ok(url) => errors.push(ValidationError::new(
            "backend.endpoint",
            format!("`{url}` must be an http(s) URL with a host"),
        )),
        Err(e) => errors.push(ValidationError::new(
            "backend.endpoint",
            format!("`{}`: {e}", config.backend.endpoint),
        )),
    }
    if config.backend.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("backend.connect_timeout_ms", "must be > 0"));
    }
    if config.backend.request_timeout_ms == 0 {
        errors.push(ValidationError::new("backend.request_timeout_ms", "must be > 0"));
    }
    if config.backend.pool_size == 0 {
        errors.push(ValidationError::new("backend.pool_size", "must be > 0"));
    }
    if config.backend.max_message_bytes == 0 {
        errors.push(ValidationError::new("backend.max_message_bytes", "must be > 0"));
    }

    if config.timeouts.body_read_ms == 0 {
        errors.push(ValidationError::new("timeouts.body_read_ms", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    } else {
        let inner_ms = config
            .timeouts
            .body_read_ms
            .saturating_add(config.backend.request_timeout_ms);
        if config.timeouts.request_secs.saturating_mul(1000) <= inner_ms {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!(
                    "must exceed timeouts.body_read_ms + backend.request_timeout_ms ({inner_ms}ms)"
                ),
            ));
        }
    }

    for (field, value) in [
        ("gateway.namespace", &config.gateway.namespace),
        ("gateway.version", &config.gateway.version),
    ] {
        if value.is_empty() || value.contains(['/', '{', '}']) {
            errors.push(ValidationError::new(
                field,
                format!("`{value}` must be a single non-empty path segment"),
            ));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    for (i, route) in config.routes.iter().enumerate() {
        if route.method.parse::<Method>().is_err() {
            errors.push(ValidationError::new(
                format!("routes[{i}].method"),
                format!("`{}` is not an HTTP method", route.method),
            ));
        }
        if let Err(e) = route.operation.parse::<OperationId>() {
            errors.push(ValidationError::new(format!("routes[{i}].operation"), e.to_string()));
        }
        if let Err(e) = Pattern::compile(&route.template) {
            errors.push(ValidationError::new(format!("routes[{i}].template"), e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
