//! gRPC channel construction.

use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

use crate::backend::BackendError;
use crate::config::BackendConfig;

/// HTTP/2 and TCP settings for channels to the backend.
///
/// Channels carry no request timeout; each call's deadline comes from its
/// `grpc-timeout` header and the local timer in `grpc.rs`.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub connect_timeout: Duration,
    pub keep_alive_interval: Option<Duration>,
    pub keep_alive_timeout: Duration,
    pub tcp_nodelay: bool,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            keep_alive_interval: Some(Duration::from_secs(30)),
            keep_alive_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

impl From<&BackendConfig> for ChannelSettings {
    fn from(config: &BackendConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            ..Self::default()
        }
    }
}

impl ChannelSettings {
    fn apply(&self, mut endpoint: Endpoint) -> Endpoint {
        if let Some(interval) = self.keep_alive_interval {
            endpoint = endpoint
                .http2_keep_alive_interval(interval)
                .keep_alive_timeout(self.keep_alive_timeout)
                .keep_alive_while_idle(true);
        }

        endpoint
            .connect_timeout(self.connect_timeout)
            .tcp_nodelay(self.tcp_nodelay)
            .tcp_keepalive(self.tcp_keepalive)
    }
}

fn endpoint(addr: &str, settings: &ChannelSettings) -> Result<Endpoint, BackendError> {
    let endpoint = Endpoint::from_shared(addr.to_string()).map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Invalid backend endpoint");
        BackendError::Unavailable(format!("invalid endpoint {addr}: {e}"))
    })?;
    Ok(settings.apply(endpoint))
}

/// Connect now; fails if the backend cannot be reached within the connect timeout.
pub async fn connect(addr: &str, settings: &ChannelSettings) -> Result<Channel, BackendError> {
    let endpoint = endpoint(addr, settings)?;
    tracing::debug!(addr = %addr, "Connecting gRPC channel");

    endpoint.connect().await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Backend connection failed");
        BackendError::Unavailable(format!("failed to connect to {addr}: {e}"))
    })
}

/// Build a channel that connects on first use.
pub fn connect_lazy(addr: &str, settings: &ChannelSettings) -> Result<Channel, BackendError> {
    let endpoint = endpoint(addr, settings)?;
    tracing::debug!(addr = %addr, "Creating lazy gRPC channel");
    Ok(endpoint.connect_lazy())
}
