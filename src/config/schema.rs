//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Remote vector service.
    pub backend: BackendConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Route prefix and request policy.
    pub gateway: RoutingConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Extra routes, registered after the built-in ones.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3839").
    pub bind_address: String,

    /// Maximum concurrently handled requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3839".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Backend (gRPC) connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend URL (e.g., "http://127.0.0.1:3838").
    pub endpoint: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Deadline for a single backend call in milliseconds.
    pub request_timeout_ms: u64,

    /// Number of channels opened to the backend.
    pub pool_size: usize,

    /// Connect on first request instead of at startup.
    pub lazy_connect: bool,

    /// Largest protobuf message sent or accepted, in bytes.
    pub max_message_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3838".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 2_000,
            pool_size: 1,
            lazy_connect: false,
            max_message_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for the HTTP side.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for reading the request body in milliseconds.
    pub body_read_ms: u64,

    /// Outer bound on a whole request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            body_read_ms: 5_000,
            request_secs: 30,
        }
    }
}

/// Route prefix and request policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// First path segment of the built-in routes.
    pub namespace: String,

    /// Second path segment of the built-in routes.
    pub version: String,

    /// Reject requests without a `request_id` (all operations but ping).
    pub require_request_id: bool,

    /// File served by the documentation route instead of the embedded one.
    pub docs_path: Option<PathBuf>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            namespace: "faiss".to_string(),
            version: "1.0".to_string(),
            require_request_id: true,
            docs_path: None,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 4 * 1024 * 1024, // 4MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// An additional route declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// HTTP method (e.g., "POST").
    #[serde(default = "default_method")]
    pub method: String,

    /// Path template, e.g. "/v1/{db_name}/hget".
    pub template: String,

    /// Operation name (ping, db_new, db_list, db_del, hset, hget, hsearch, hdel, docs).
    pub operation: String,
}

fn default_method() -> String {
    "POST".to_string()
}
