//! In-process backend for unit tests.
//!
//! `ping` answers "pong", `hget` succeeds only for id 7, `hset` fails as
//! unreachable and `hsearch` as timed out.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::{BackendError, BackendResult, FaissBackend};
use crate::codec::messages::*;

/// Answers every call with a fixed response and counts calls.
#[derive(Default)]
pub struct StubBackend {
    pub calls: AtomicUsize,
    pub wrong_request_id: bool,
}

impl StubBackend {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn echo(&self, request_id: String) -> EmptyResponse {
        self.hit();
        EmptyResponse {
            request_id: if self.wrong_request_id { "other".into() } else { request_id },
            error_code: 0,
        }
    }
}

#[async_trait]
impl FaissBackend for StubBackend {
    async fn ping(&self, req: PingRequest, _: Duration) -> BackendResult<PingResponse> {
        self.hit();
        let payload = if req.payload == "ping" { "pong" } else { "" };
        Ok(PingResponse { payload: payload.into() })
    }

    async fn db_new(&self, req: DbNewRequest, _: Duration) -> BackendResult<EmptyResponse> {
        Ok(self.echo(req.request_id))
    }

    async fn db_list(&self, req: DbListRequest, _: Duration) -> BackendResult<DbListResponse> {
        self.hit();
        Ok(DbListResponse {
            request_id: req.request_id,
            error_code: 0,
            db_status: vec![],
        })
    }

    async fn db_del(&self, req: DbDelRequest, _: Duration) -> BackendResult<EmptyResponse> {
        Ok(self.echo(req.request_id))
    }

    async fn hset(&self, _: HSetRequest, _: Duration) -> BackendResult<HSetResponse> {
        self.hit();
        Err(BackendError::Unavailable("connection refused".into()))
    }

    async fn hget(&self, req: HGetDelRequest, _: Duration) -> BackendResult<HGetResponse> {
        self.hit();
        Ok(HGetResponse {
            request_id: req.request_id,
            error_code: if req.id == 7 { 0 } else { 2 },
            dimension: req.id,
            feature: vec![],
        })
    }

    async fn hsearch(&self, _: HSearchRequest, t: Duration) -> BackendResult<HSearchResponse> {
        self.hit();
        Err(BackendError::Timeout(t))
    }

    async fn hdel(&self, req: HGetDelRequest, _: Duration) -> BackendResult<EmptyResponse> {
        Ok(self.echo(req.request_id))
    }
}
