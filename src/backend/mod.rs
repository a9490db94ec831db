//! Backend client subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (typed request + deadline)
//!     → FaissBackend trait (one method per RPC)
//!     → grpc.rs (tonic unary call, protobuf codec)
//!     → pool.rs (round-robin over HTTP/2 channels)
//!     → channel.rs (endpoint settings: connect timeout, keep-alive)
//!     → remote vector service
//! ```
//!
//! # Design Decisions
//! - The trait is the seam: tests plug in an in-process implementation
//! - Every call carries a deadline; exceeding it is a distinct error
//! - Backend status codes are kept verbatim, never reinterpreted
//! - Channels are shared across requests; a failed call leaves no state behind

pub mod channel;
pub mod grpc;
pub mod pool;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

use crate::codec::messages::*;

pub use grpc::GrpcBackend;

pub type BackendResult<T> = Result<T, BackendError>;

/// Boxed future returned by [`FaissBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = BackendResult<T>> + Send + 'a>>;

/// Failure of a single backend call.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend could not be reached (connect failure, broken channel).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its deadline.
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-OK RPC status.
    #[error("backend returned {code:?}: {message}")]
    Status { code: tonic::Code, message: String },
}

impl BackendError {
    /// RPC status code describing this failure.
    pub fn code(&self) -> tonic::Code {
        match self {
            BackendError::Unavailable(_) => tonic::Code::Unavailable,
            BackendError::Timeout(_) => tonic::Code::DeadlineExceeded,
            BackendError::Status { code, .. } => *code,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Unavailable(_) => "unavailable",
            BackendError::Timeout(_) => "timeout",
            BackendError::Status { .. } => "status",
        }
    }
}

impl From<tonic::Status> for BackendError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Unavailable => BackendError::Unavailable(status.message().to_string()),
            code => BackendError::Status {
                code,
                message: status.message().to_string(),
            },
        }
    }
}

/// Call contract of the remote vector service.
#[async_trait]
pub trait FaissBackend: Send + Sync {
    async fn ping(&self, req: PingRequest, timeout: Duration) -> BackendResult<PingResponse>;

    async fn db_new(&self, req: DbNewRequest, timeout: Duration) -> BackendResult<EmptyResponse>;

    async fn db_list(&self, req: DbListRequest, timeout: Duration)
        -> BackendResult<DbListResponse>;

    async fn db_del(&self, req: DbDelRequest, timeout: Duration) -> BackendResult<EmptyResponse>;

    async fn hset(&self, req: HSetRequest, timeout: Duration) -> BackendResult<HSetResponse>;

    async fn hget(&self, req: HGetDelRequest, timeout: Duration) -> BackendResult<HGetResponse>;

    async fn hsearch(
        &self,
        req: HSearchRequest,
        timeout: Duration,
    ) -> BackendResult<HSearchResponse>;

    async fn hdel(&self, req: HGetDelRequest, timeout: Duration) -> BackendResult<EmptyResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = BackendError::from(tonic::Status::unavailable("connection refused"));
        assert!(matches!(err, BackendError::Unavailable(_)));
        assert_eq!(err.code(), tonic::Code::Unavailable);

        let err = BackendError::from(tonic::Status::not_found("no such db"));
        assert_eq!(err.code(), tonic::Code::NotFound);
        assert_eq!(err.kind(), "status");
        assert!(err.to_string().contains("no such db"));

        let err = BackendError::Timeout(Duration::from_millis(5));
        assert_eq!(err.code(), tonic::Code::DeadlineExceeded);
    }
}
