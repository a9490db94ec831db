//! Operation descriptors.
//!
//! Each backend operation is described once: its name, its default path
//! suffix under `/<namespace>/<version>/`, and its request/response message
//! types. The route table binds templates to [`OperationId`]s, and the
//! dispatcher turns an id back into the typed [`Operation`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{BackendFuture, FaissBackend};
use crate::codec::messages::*;

/// Every operation reachable through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationId {
    Ping,
    DbNew,
    DbList,
    DbDel,
    HSet,
    HGet,
    HSearch,
    HDel,
    /// Static API description, served without a backend call.
    Docs,
}

impl OperationId {
    /// Backend-backed operations, in registration order.
    pub const BACKEND: [OperationId; 8] = [
        OperationId::Ping,
        OperationId::DbNew,
        OperationId::DbList,
        OperationId::DbDel,
        OperationId::HSet,
        OperationId::HGet,
        OperationId::HSearch,
        OperationId::HDel,
    ];

    /// Stable name used in logs, metrics and config files.
    pub fn name(self) -> &'static str {
        match self {
            OperationId::Ping => "ping",
            OperationId::DbNew => "db_new",
            OperationId::DbList => "db_list",
            OperationId::DbDel => "db_del",
            OperationId::HSet => "hset",
            OperationId::HGet => "hget",
            OperationId::HSearch => "hsearch",
            OperationId::HDel => "hdel",
            OperationId::Docs => "docs",
        }
    }

    /// Path segments appended to `/<namespace>/<version>` for the built-in route.
    pub fn default_suffix(self) -> &'static [&'static str] {
        match self {
            OperationId::Ping => &["ping"],
            OperationId::DbNew => &["db", "new"],
            OperationId::DbList => &["db", "list"],
            OperationId::DbDel => &["db", "del"],
            OperationId::HSet => &["hset"],
            OperationId::HGet => &["hget"],
            OperationId::HSearch => &["hsearch"],
            OperationId::HDel => &["hdel"],
            OperationId::Docs => &["swagger.json"],
        }
    }

    /// HTTP method of the built-in route.
    pub fn default_method(self) -> axum::http::Method {
        match self {
            OperationId::Docs => axum::http::Method::GET,
            _ => axum::http::Method::POST,
        }
    }

    /// RPC method name on the backend service, `None` for the docs route.
    pub fn rpc_method(self) -> Option<&'static str> {
        match self {
            OperationId::Ping => Some("Ping"),
            OperationId::DbNew => Some("DbNew"),
            OperationId::DbList => Some("DbList"),
            OperationId::DbDel => Some("DbDel"),
            OperationId::HSet => Some("HSet"),
            OperationId::HGet => Some("HGet"),
            OperationId::HSearch => Some("HSearch"),
            OperationId::HDel => Some("HDel"),
            OperationId::Docs => None,
        }
    }

    /// Whether the request must carry a correlation identifier.
    pub fn requires_request_id(self) -> bool {
        !matches!(self, OperationId::Ping | OperationId::Docs)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognised operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation `{0}`")]
pub struct UnknownOperation(pub String);

impl FromStr for OperationId {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationId::BACKEND
            .iter()
            .chain(std::iter::once(&OperationId::Docs))
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// Typed schema of a backend-backed operation.
pub trait Operation: Send + Sync + 'static {
    const ID: OperationId;

    type Request: DeserializeOwned + prost::Message + Default + Send + Sync + 'static;
    type Response: Serialize + prost::Message + Default + Send + Sync + 'static;

    /// Correlation id of the request; `None` for uncorrelated operations.
    fn request_id(req: &Self::Request) -> Option<&str>;

    /// Correlation id the backend put in its response.
    fn response_request_id(res: &Self::Response) -> Option<&str>;

    /// Force the response's correlation id to the given value.
    fn echo_request_id(res: &mut Self::Response, request_id: &str);

    /// Status code carried by the response (0 = success).
    fn error_code(res: &Self::Response) -> i64;

    /// Call the matching backend method.
    fn invoke<'a>(
        backend: &'a dyn FaissBackend,
        req: Self::Request,
        timeout: Duration,
    ) -> BackendFuture<'a, Self::Response>;
}

macro_rules! correlated_operation {
    ($name:ident, $id:expr, $method:ident, $req:ty, $res:ty) => {
        pub struct $name;

        impl Operation for $name {
            const ID: OperationId = $id;
            type Request = $req;
            type Response = $res;

            fn request_id(req: &Self::Request) -> Option<&str> {
                Some(Correlated::request_id(req))
            }

            fn response_request_id(res: &Self::Response) -> Option<&str> {
                Some(Correlated::request_id(res))
            }

            fn echo_request_id(res: &mut Self::Response, request_id: &str) {
                res.set_request_id(request_id.to_string());
            }

            fn error_code(res: &Self::Response) -> i64 {
                Status::error_code(res)
            }

            fn invoke<'a>(
                backend: &'a dyn FaissBackend,
                req: Self::Request,
                timeout: Duration,
            ) -> BackendFuture<'a, Self::Response> {
                backend.$method(req, timeout)
            }
        }
    };
}

/// Health check: `{"payload":"ping"}` → `{"payload":"pong"}`.
pub struct Ping;

impl Operation for Ping {
    const ID: OperationId = OperationId::Ping;
    type Request = PingRequest;
    type Response = PingResponse;

    fn request_id(_req: &Self::Request) -> Option<&str> {
        None
    }

    fn response_request_id(_res: &Self::Response) -> Option<&str> {
        None
    }

    fn echo_request_id(_res: &mut Self::Response, _request_id: &str) {}

    fn error_code(_res: &Self::Response) -> i64 {
        0
    }

    fn invoke<'a>(
        backend: &'a dyn FaissBackend,
        req: Self::Request,
        timeout: Duration,
    ) -> BackendFuture<'a, Self::Response> {
        backend.ping(req, timeout)
    }
}

correlated_operation!(DbNew, OperationId::DbNew, db_new, DbNewRequest, EmptyResponse);
correlated_operation!(DbList, OperationId::DbList, db_list, DbListRequest, DbListResponse);
correlated_operation!(DbDel, OperationId::DbDel, db_del, DbDelRequest, EmptyResponse);
correlated_operation!(HSet, OperationId::HSet, hset, HSetRequest, HSetResponse);
correlated_operation!(HGet, OperationId::HGet, hget, HGetDelRequest, HGetResponse);
correlated_operation!(HSearch, OperationId::HSearch, hsearch, HSearchRequest, HSearchResponse);
correlated_operation!(HDel, OperationId::HDel, hdel, HGetDelRequest, EmptyResponse);
