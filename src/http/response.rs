//! Response construction and error translation.
//!
//! # Responsibilities
//! - Map every gateway failure to one HTTP status and one `error_code`
//! - Render failures as the JSON error envelope
//! - Build JSON and documentation responses
//!
//! # Design Decisions
//! - `error_code` values reuse RPC status numbering
//! - HTTP statuses follow the usual RPC-to-HTTP mapping
//! - Backend statuses are relayed verbatim, never reinterpreted
//! - Backend timeouts result in 504 Gateway Timeout

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::{DecodeError, EncodeError};

const APPLICATION_JSON: &str = "application/json";

/// A request that ended in the FAILED state.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route for {method} {path}")]
    NotFound { method: Method, path: String },

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("request body not received within {0:?}")]
    BodyTimeout(Duration),

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl GatewayError {
    /// Status code placed in the envelope's `error_code`.
    pub fn code(&self) -> tonic::Code {
        match self {
            GatewayError::NotFound { .. } | GatewayError::MethodNotAllowed { .. } => {
                tonic::Code::NotFound
            }
            GatewayError::Decode(_) | GatewayError::BodyRead(_) => tonic::Code::InvalidArgument,
            GatewayError::PayloadTooLarge { .. } => tonic::Code::ResourceExhausted,
            GatewayError::BodyTimeout(_) => tonic::Code::DeadlineExceeded,
            GatewayError::Backend(e) => e.code(),
            GatewayError::Encode(_) => tonic::Code::Internal,
        }
    }

    /// HTTP status of the failure response.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            other => http_status(other.code()),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::MethodNotAllowed { .. } => "method_not_allowed",
            GatewayError::Decode(_) => "decode",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::BodyTimeout(_) => "body_timeout",
            GatewayError::BodyRead(_) => "body_read",
            GatewayError::Backend(e) => e.kind(),
            GatewayError::Encode(_) => "encode",
        }
    }

    /// Attach the correlation id recovered from the request, if any.
    pub fn with_request_id(self, request_id: Option<String>) -> Failure {
        Failure {
            error: self,
            request_id,
        }
    }
}

/// Map an RPC status code to an HTTP status.
pub fn http_status(code: tonic::Code) -> StatusCode {
    use tonic::Code;

    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
            StatusCode::BAD_REQUEST
        }
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// JSON body of a failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub error_code: i64,
    pub error: String,
}

/// A gateway error ready to be sent, with the echoed correlation id.
#[derive(Debug)]
pub struct Failure {
    pub error: GatewayError,
    pub request_id: Option<String>,
}

impl Failure {
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            request_id: self.request_id.clone(),
            error_code: self.error.code() as i64,
            error: self.error.to_string(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let status = self.error.status();
        // ErrorBody holds only strings and an integer.
        let body = serde_json::to_vec(&self.body()).unwrap_or_default();
        let mut response = json_response(status, Bytes::from(body));

        if let GatewayError::MethodNotAllowed { allowed, .. } = &self.error {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.with_request_id(None).into_response()
    }
}

/// A response carrying an encoded JSON document.
pub fn json_response(status: StatusCode, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_JSON),
    );
    response
}
