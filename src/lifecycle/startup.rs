//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Compile the route table (built-in plus configured routes)
//! - Connect the backend channel pool
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use axum::http::Method;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::backend::{BackendError, FaissBackend, GrpcBackend};
use crate::config::{ConfigError, GatewayConfig};
use crate::http::dispatcher::{DispatchPolicy, Dispatcher, EMBEDDED_DOCS};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability;
use crate::routing::{OperationId, RouteError, RouteTable};

/// Errors that abort the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    #[error("routes[{index}]: {message}")]
    RouteDeclaration { index: usize, message: String },

    #[error("backend {endpoint} unreachable: {source}")]
    Backend {
        endpoint: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to read documentation {path:?}: {source}")]
    Docs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Built-in routes followed by the configured ones.
pub fn build_routes(config: &GatewayConfig) -> Result<RouteTable, StartupError> {
    let mut table = RouteTable::with_builtin(&config.gateway.namespace, &config.gateway.version)?;

    for (index, route) in config.routes.iter().enumerate() {
        let method = route
            .method
            .parse::<Method>()
            .map_err(|e| StartupError::RouteDeclaration {
                index,
                message: e.to_string(),
            })?;
        let operation = route
            .operation
            .parse::<OperationId>()
            .map_err(|e| StartupError::RouteDeclaration {
                index,
                message: e.to_string(),
            })?;
        table.register_template(method, &route.template, operation)?;
    }

    tracing::info!(routes = table.len(), "Route table compiled");
    Ok(table)
}

/// The documentation document: the configured file or the embedded one.
pub fn load_docs(config: &GatewayConfig) -> Result<Bytes, StartupError> {
    match &config.gateway.docs_path {
        Some(path) => std::fs::read(path)
            .map(Bytes::from)
            .map_err(|source| StartupError::Docs {
                path: path.clone(),
                source,
            }),
        None => Ok(Bytes::from_static(EMBEDDED_DOCS.as_bytes())),
    }
}

/// Open the gRPC channel pool.
pub async fn connect_backend(config: &GatewayConfig) -> Result<Arc<dyn FaissBackend>, StartupError> {
    let backend = GrpcBackend::connect(&config.backend)
        .await
        .map_err(|source| StartupError::Backend {
            endpoint: config.backend.endpoint.clone(),
            source,
        })?;
    Ok(Arc::new(backend))
}

/// A bound, ready-to-serve gateway.
pub struct Gateway {
    server: HttpServer,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Gateway {
    /// Compile routes, load docs and bind the listener.
    pub async fn bind(
        config: &GatewayConfig,
        backend: Arc<dyn FaissBackend>,
    ) -> Result<Self, StartupError> {
        let routes = build_routes(config)?;
        let docs = load_docs(config)?;
        let dispatcher = Dispatcher::new(routes, backend, docs, DispatchPolicy::from_config(config));
        let server = HttpServer::new(config, Arc::new(dispatcher));

        let address = config.listener.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { address, source })?;

        Ok(Self {
            server,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.server
            .run(self.listener, shutdown)
            .await
            .map_err(StartupError::Serve)
    }
}

/// Run the gateway with an already-initialized logger.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.endpoint,
        namespace = %config.gateway.namespace,
        version = %config.gateway.version,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated as a socket address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr)?;
        }
    }

    let backend = connect_backend(&config).await?;
    let gateway = Gateway::bind(&config, backend).await?;
    tracing::info!(address = %gateway.local_addr(), "Listening for connections");

    let shutdown = Shutdown::new();
    let signals = spawn_signal_handler(shutdown.clone());
    gateway.serve(shutdown.wait()).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StubBackend;
    use crate::config::RouteConfig;

    #[test]
    fn test_configured_routes_follow_builtins() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            method: "POST".into(),
            template: "/v2/{db_name}/hget".into(),
            operation: "hget".into(),
        });
        let table = build_routes(&config).unwrap();
        assert_eq!(table.len(), 10);
        assert_eq!(table.routes_for(&Method::POST).last().unwrap().operation, OperationId::HGet);
    }

    #[test]
    fn test_duplicate_configured_route_is_fatal() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            method: "POST".into(),
            template: "/faiss/1.0/hset".into(),
            operation: "hsearch".into(),
        });
        assert!(matches!(
            build_routes(&config),
            Err(StartupError::Routes(RouteError::Duplicate { .. }))
        ));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            method: "POST".into(),
            template: "/x".into(),
            operation: "reindex".into(),
        });
        assert!(matches!(
            build_routes(&config),
            Err(StartupError::RouteDeclaration { index: 0, .. })
        ));
    }

    #[test]
    fn test_docs_default_to_embedded() {
        let docs = load_docs(&GatewayConfig::default()).unwrap();
        assert_eq!(&docs[..], EMBEDDED_DOCS.as_bytes());

        let mut config = GatewayConfig::default();
        config.gateway.docs_path = Some("/nonexistent/swagger.json".into());
        assert!(matches!(load_docs(&config), Err(StartupError::Docs { .. })));
    }

    #[tokio::test]
    async fn test_eager_connect_to_dead_backend_is_fatal() {
        let mut config = GatewayConfig::default();
        config.backend.endpoint = "http://127.0.0.1:1".into();
        config.backend.connect_timeout_ms = 200;
        let err = connect_backend(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        let first = Gateway::bind(&config, Arc::new(StubBackend::default()))
            .await
            .unwrap();

        config.listener.bind_address = first.local_addr().to_string();
        let err = Gateway::bind(&config, Arc::new(StubBackend::default()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
