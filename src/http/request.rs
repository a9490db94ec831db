//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) when the client sent none
//! - Read the request body within a size limit and a deadline
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Declared `Content-Length` is checked before any byte is read
//! - The HTTP request id (`x-request-id`) is independent from the
//!   `request_id` correlation field inside JSON bodies

use axum::body::Body;
use axum::http::{header, HeaderMap, Request};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::time::Duration;
use tower_http::request_id::RequestId;

use crate::http::response::GatewayError;

/// Header carrying the per-request identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

pub use tower_http::request_id::MakeRequestUuid;

/// Access to the request id set by `SetRequestIdLayer`.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .or_else(|| {
                self.headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
            })
    }
}

/// Limits applied while reading a body.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_bytes: usize,
    pub timeout: Duration,
}

/// Buffer the whole body, enforcing `limits`.
pub async fn read_body(
    headers: &HeaderMap,
    body: Body,
    limits: BodyLimits,
) -> Result<Bytes, GatewayError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limits.max_bytes as u64) {
        return Err(GatewayError::PayloadTooLarge {
            limit: limits.max_bytes,
        });
    }

    let collected = tokio::time::timeout(
        limits.timeout,
        Limited::new(body, limits.max_bytes).collect(),
    )
    .await
    .map_err(|_| GatewayError::BodyTimeout(limits.timeout))?;

    match collected {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(GatewayError::PayloadTooLarge {
                limit: limits.max_bytes,
            })
        }
        Err(e) => Err(GatewayError::BodyRead(e.to_string())),
    }
}

/// A body that never produces a frame.
#[cfg(test)]
pub(crate) fn stalled_body() -> Body {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct Stalled;

    impl http_body::Body for Stalled {
        type Data = Bytes;
        type Error = std::convert::Infallible;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<http_body::Frame<Bytes>, Self::Error>>> {
            Poll::Pending
        }
    }

    Body::new(Stalled)
}
