//! Per-request dispatcher.
//!
//! Every request walks the same state machine:
//!
//! ```text
//! RECEIVED → ROUTED → DECODED → DISPATCHED → ENCODED → SENT
//!     \         \         \          \          \
//!      `---------`---------`----------`----------`---→ FAILED
//! ```
//!
//! The documentation route goes straight from ROUTED to SENT. Each terminal
//! state produces exactly one response; a failure before DISPATCHED never
//! reaches the backend.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::FaissBackend;
use crate::codec::{encode, DecodeError, Envelope};
use crate::config::GatewayConfig;
use crate::http::request::{read_body, BodyLimits};
use crate::http::response::{json_response, GatewayError};
use crate::observability::metrics;
use crate::routing::operation::{self as ops, Operation};
use crate::routing::{Captures, OperationId, Resolution, RouteTable};

/// API description shipped with the binary.
pub const EMBEDDED_DOCS: &str = include_str!("../../api/faiss.swagger.json");

/// Request lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Routed,
    Decoded,
    Dispatched,
    Encoded,
    Sent,
    Failed,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Routed => "routed",
            Stage::Decoded => "decoded",
            Stage::Dispatched => "dispatched",
            Stage::Encoded => "encoded",
            Stage::Sent => "sent",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Sent | Stage::Failed)
    }

    /// Whether `next` may directly follow `self`.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;

        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed) => true,
            (Received, Routed)
            | (Routed, Decoded)
            | (Routed, Sent)
            | (Decoded, Dispatched)
            | (Dispatched, Encoded)
            | (Encoded, Sent) => true,
            _ => false,
        }
    }
}

/// Per-request processing context.
#[derive(Debug)]
struct Flow {
    stage: Stage,
    operation: Option<OperationId>,
    request_id: Option<String>,
}

impl Flow {
    fn new() -> Self {
        Self {
            stage: Stage::Received,
            operation: None,
            request_id: None,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::debug!(from = self.stage.name(), to = next.name(), "Request state transition");
        self.stage = next;
    }

    fn operation_name(&self) -> &'static str {
        self.operation.map(OperationId::name).unwrap_or("none")
    }
}

/// Request handling knobs, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    pub require_request_id: bool,
    pub backend_timeout: Duration,
    pub body: BodyLimits,
}

impl DispatchPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            require_request_id: config.gateway.require_request_id,
            backend_timeout: Duration::from_millis(config.backend.request_timeout_ms),
            body: BodyLimits {
                max_bytes: config.security.max_body_size,
                timeout: Duration::from_millis(config.timeouts.body_read_ms),
            },
        }
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Routes, decodes, calls the backend and encodes, one request at a time.
pub struct Dispatcher {
    routes: RouteTable,
    backend: Arc<dyn FaissBackend>,
    docs: Bytes,
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(
        routes: RouteTable,
        backend: Arc<dyn FaissBackend>,
        docs: Bytes,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            routes,
            backend,
            docs,
            policy,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Handle one request. Always yields exactly one response.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let started = Instant::now();
        let mut flow = Flow::new();

        let response = match self.process(&mut flow, request).await {
            Ok(response) => {
                flow.advance(Stage::Sent);
                response
            }
            Err(error) => {
                flow.advance(Stage::Failed);
                if let GatewayError::Encode(_) = error {
                    tracing::error!(operation = flow.operation_name(), error = %error, "Failed to encode response");
                } else {
                    tracing::warn!(
                        operation = flow.operation_name(),
                        kind = error.kind(),
                        error = %error,
                        "Request failed"
                    );
                }
                error.with_request_id(flow.request_id.take()).into_response()
            }
        };

        metrics::record_request(flow.operation_name(), response.status().as_u16(), started);
        response
    }

    async fn process(
        &self,
        flow: &mut Flow,
        request: Request<Body>,
    ) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path();

        let (operation, captures) = match self.routes.resolve(&parts.method, path) {
            Resolution::Matched { route, captures } => (route.operation, captures),
            Resolution::MethodNotAllowed { allowed } => {
                return Err(GatewayError::MethodNotAllowed {
                    method: parts.method.clone(),
                    path: path.to_string(),
                    allowed,
                });
            }
            Resolution::NotFound => {
                return Err(GatewayError::NotFound {
                    method: parts.method.clone(),
                    path: path.to_string(),
                });
            }
        };

        flow.operation = Some(operation);
        tracing::Span::current().record("operation", operation.name());
        flow.advance(Stage::Routed);

        let headers = &parts.headers;
        match operation {
            OperationId::Docs => Ok(json_response(StatusCode::OK, self.docs.clone())),
            OperationId::Ping => self.run::<ops::Ping>(flow, headers, body, captures).await,
            OperationId::DbNew => self.run::<ops::DbNew>(flow, headers, body, captures).await,
            OperationId::DbList => {
                self.run::<ops::DbList>(flow, headers, body, captures).await
            }
            OperationId::DbDel => self.run::<ops::DbDel>(flow, headers, body, captures).await,
            OperationId::HSet => self.run::<ops::HSet>(flow, headers, body, captures).await,
            OperationId::HGet => self.run::<ops::HGet>(flow, headers, body, captures).await,
            OperationId::HSearch => {
                self.run::<ops::HSearch>(flow, headers, body, captures).await
            }
            OperationId::HDel => self.run::<ops::HDel>(flow, headers, body, captures).await,
        }
    }

    async fn run<Op: Operation>(
        &self,
        flow: &mut Flow,
        headers: &HeaderMap,
        body: Body,
        captures: Captures,
    ) -> Result<Response, GatewayError> {
        let bytes = read_body(headers, body, self.policy.body).await?;
        let mut envelope = Envelope::parse(&bytes)?;
        envelope.merge_captures(captures.iter());
        flow.request_id = envelope.request_id().map(str::to_owned);

        let request: Op::Request = envelope.decode()?;
        let request_id = Op::request_id(&request).unwrap_or_default().to_owned();
        if self.policy.require_request_id && Op::ID.requires_request_id() && request_id.is_empty()
        {
            return Err(DecodeError::MissingRequestId.into());
        }
        flow.advance(Stage::Decoded);

        let mut response =
            match Op::invoke(self.backend.as_ref(), request, self.policy.backend_timeout).await {
                Ok(response) => response,
                Err(e) => {
                    metrics::record_backend_error(Op::ID.name(), e.kind());
                    return Err(e.into());
                }
            };
        flow.advance(Stage::Dispatched);

        if let Some(echoed) = Op::response_request_id(&response).filter(|id| *id != request_id) {
            if !echoed.is_empty() {
                tracing::warn!(
                    expected = %request_id,
                    received = %echoed,
                    "Backend answered with a different request_id"
                );
            }
            Op::echo_request_id(&mut response, &request_id);
        }

        let error_code = Op::error_code(&response);
        if error_code != 0 {
            tracing::info!(error_code, request_id = %request_id, "Backend reported an error");
        }

        let body = encode(&response)?;
        flow.advance(Stage::Encoded);
        Ok(json_response(StatusCode::OK, body))
    }
}
