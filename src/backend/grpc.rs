//! tonic client for the `faiss.FaissService` RPC service.
//!
//! # Responsibilities
//! - Issue unary calls with the protobuf codec
//! - Attach the per-call deadline (`grpc-timeout`) and enforce it locally
//! - Translate RPC failures into [`BackendError`]
//!
//! Dropping a call future (client disconnect) resets its HTTP/2 stream, so an
//! abandoned request does not hold a backend slot.

use async_trait::async_trait;
use std::time::Duration;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

use crate::backend::channel::ChannelSettings;
use crate::backend::pool::ChannelPool;
use crate::backend::{BackendError, BackendResult, FaissBackend};
use crate::codec::messages::*;
use crate::config::BackendConfig;
use crate::resilience::timeouts::with_deadline;

/// Fully qualified RPC service name.
pub const SERVICE: &str = "faiss.FaissService";

/// Client stub for `faiss.FaissService`, one method per RPC.
#[derive(Debug, Clone)]
pub struct FaissServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl FaissServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Limits the maximum size of a decoded message.
    #[must_use]
    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Limits the maximum size of an encoded message.
    #[must_use]
    pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_encoding_message_size(limit);
        self
    }

    async fn unary<Req, Res>(
        &mut self,
        request: tonic::Request<Req>,
        method: &'static str,
        path: &'static str,
    ) -> Result<tonic::Response<Res>, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Res: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("Service was not ready: {e}")))?;

        let codec = tonic_prost::ProstCodec::<Req, Res>::default();
        let path = PathAndQuery::from_static(path);
        let mut request = request;
        request
            .extensions_mut()
            .insert(tonic::GrpcMethod::new(SERVICE, method));
        self.inner.unary(request, path, codec).await
    }

    pub async fn ping(
        &mut self,
        request: tonic::Request<PingRequest>,
    ) -> Result<tonic::Response<PingResponse>, tonic::Status> {
        self.unary(request, "Ping", "/faiss.FaissService/Ping").await
    }

    pub async fn db_new(
        &mut self,
        request: tonic::Request<DbNewRequest>,
    ) -> Result<tonic::Response<EmptyResponse>, tonic::Status> {
        self.unary(request, "DbNew", "/faiss.FaissService/DbNew").await
    }

    pub async fn db_list(
        &mut self,
        request: tonic::Request<DbListRequest>,
    ) -> Result<tonic::Response<DbListResponse>, tonic::Status> {
        self.unary(request, "DbList", "/faiss.FaissService/DbList").await
    }

    pub async fn db_del(
        &mut self,
        request: tonic::Request<DbDelRequest>,
    ) -> Result<tonic::Response<EmptyResponse>, tonic::Status> {
        self.unary(request, "DbDel", "/faiss.FaissService/DbDel").await
    }

    pub async fn hset(
        &mut self,
        request: tonic::Request<HSetRequest>,
    ) -> Result<tonic::Response<HSetResponse>, tonic::Status> {
        self.unary(request, "HSet", "/faiss.FaissService/HSet").await
    }

    pub async fn hget(
        &mut self,
        request: tonic::Request<HGetDelRequest>,
    ) -> Result<tonic::Response<HGetResponse>, tonic::Status> {
        self.unary(request, "HGet", "/faiss.FaissService/HGet").await
    }

    pub async fn hsearch(
        &mut self,
        request: tonic::Request<HSearchRequest>,
    ) -> Result<tonic::Response<HSearchResponse>, tonic::Status> {
        self.unary(request, "HSearch", "/faiss.FaissService/HSearch").await
    }

    pub async fn hdel(
        &mut self,
        request: tonic::Request<HGetDelRequest>,
    ) -> Result<tonic::Response<EmptyResponse>, tonic::Status> {
        self.unary(request, "HDel", "/faiss.FaissService/HDel").await
    }
}

/// [`FaissBackend`] over a pool of gRPC channels.
#[derive(Debug)]
pub struct GrpcBackend {
    pool: ChannelPool,
    max_message_bytes: usize,
}

impl GrpcBackend {
    pub fn new(pool: ChannelPool, max_message_bytes: usize) -> Self {
        Self {
            pool,
            max_message_bytes,
        }
    }

    /// Open the channel pool described by the backend configuration.
    pub async fn connect(config: &BackendConfig) -> Result<Self, BackendError> {
        let settings = ChannelSettings::from(config);
        let pool =
            ChannelPool::open(&config.endpoint, config.pool_size, config.lazy_connect, &settings)
                .await?;
        Ok(Self::new(pool, config.max_message_bytes))
    }

    fn client(&self) -> FaissServiceClient {
        FaissServiceClient::new(self.pool.next())
            .max_decoding_message_size(self.max_message_bytes)
            .max_encoding_message_size(self.max_message_bytes)
    }
}

fn request<T>(message: T, timeout: Duration) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    request.set_timeout(timeout);
    request
}

/// Message of the status tonic's channel returns when the `grpc-timeout`
/// deadline it enforces expires.
const TIMEOUT_EXPIRED: &str = "Timeout expired";

/// Translate a failed call. The channel reports its own deadline expiry as
/// `Cancelled`; the gateway never cancels a call any other way.
fn call_error(status: tonic::Status, timeout: Duration) -> BackendError {
    if status.code() == tonic::Code::Cancelled && status.message() == TIMEOUT_EXPIRED {
        BackendError::Timeout(timeout)
    } else {
        BackendError::from(status)
    }
}

macro_rules! forward {
    ($self:ident, $method:ident, $req:ident, $timeout:ident) => {{
        let mut client = $self.client();
        let response = with_deadline($timeout, client.$method(request($req, $timeout))).await?;
        response
            .map(tonic::Response::into_inner)
            .map_err(|status| call_error(status, $timeout))
    }};
}

#[async_trait]
impl FaissBackend for GrpcBackend {
    async fn ping(&self, req: PingRequest, timeout: Duration) -> BackendResult<PingResponse> {
        forward!(self, ping, req, timeout)
    }

    async fn db_new(&self, req: DbNewRequest, timeout: Duration) -> BackendResult<EmptyResponse> {
        forward!(self, db_new, req, timeout)
    }

    async fn db_list(
        &self,
        req: DbListRequest,
        timeout: Duration,
    ) -> BackendResult<DbListResponse> {
        forward!(self, db_list, req, timeout)
    }

    async fn db_del(&self, req: DbDelRequest, timeout: Duration) -> BackendResult<EmptyResponse> {
        forward!(self, db_del, req, timeout)
    }

    async fn hset(&self, req: HSetRequest, timeout: Duration) -> BackendResult<HSetResponse> {
        forward!(self, hset, req, timeout)
    }

    async fn hget(&self, req: HGetDelRequest, timeout: Duration) -> BackendResult<HGetResponse> {
        forward!(self, hget, req, timeout)
    }

    async fn hsearch(
        &self,
        req: HSearchRequest,
        timeout: Duration,
    ) -> BackendResult<HSearchResponse> {
        forward!(self, hsearch, req, timeout)
    }

    async fn hdel(&self, req: HGetDelRequest, timeout: Duration) -> BackendResult<EmptyResponse> {
        forward!(self, hdel, req, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn unreachable_backend() -> GrpcBackend {
        let config = BackendConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            connect_timeout_ms: 200,
            request_timeout_ms: 500,
            pool_size: 2,
            lazy_connect: true,
            ..BackendConfig::default()
        };
        GrpcBackend::connect(&config).await.unwrap()
    }

    #[test]
    fn test_channel_deadline_is_a_timeout() {
        let timeout = Duration::from_millis(200);
        let err = call_error(tonic::Status::cancelled(TIMEOUT_EXPIRED), timeout);
        assert!(matches!(err, BackendError::Timeout(d) if d == timeout));
        assert_eq!(err.code(), tonic::Code::DeadlineExceeded);

        let err = call_error(tonic::Status::cancelled("stream reset"), timeout);
        assert_eq!(err.code(), tonic::Code::Cancelled);

        let err = call_error(tonic::Status::unavailable("refused"), timeout);
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let backend = unreachable_backend().await;
        let err = backend
            .ping(PingRequest { payload: "ping".into() }, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)), "unexpected error: {err}");
        assert_eq!(err.code(), tonic::Code::Unavailable);
    }

    #[tokio::test]
    async fn test_every_pooled_channel_fails_independently() {
        let backend = unreachable_backend().await;
        for _ in 0..4 {
            let err = backend
                .db_list(
                    DbListRequest { request_id: "1".into() },
                    Duration::from_millis(500),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, BackendError::Unavailable(_)), "unexpected error: {err}");
        }
    }
}
