//! Message codec subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP body bytes
//!     → Envelope::parse (JSON object, empty body = {})
//!     → merge path captures (captures override body fields)
//!     → Envelope::decode::<Request>() (serde, defaults for missing fields)
//!     → typed request (also a prost message for the backend)
//!
//! typed response → encode() → JSON bytes
//! ```
//!
//! # Design Decisions
//! - One schema per message for both JSON and protobuf (messages.rs)
//! - Permissive about unknown/missing fields, strict about syntax
//! - Feature buffers travel as base64 and are never interpreted here

pub mod json;
pub mod messages;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::codec::messages::Correlated;

/// JSON field holding the correlation identifier.
pub const REQUEST_ID_FIELD: &str = "request_id";

/// Reasons a request body is not valid for an operation.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request body is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid request: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("missing required field `request_id`")]
    MissingRequestId,
}

/// A response that could not be serialized.
#[derive(Debug, Error)]
#[error("failed to encode response: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// A parsed but not yet typed request body.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Parse raw body bytes. An empty (or whitespace-only) body is `{}`.
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        match serde_json::from_slice::<Value>(body).map_err(DecodeError::Syntax)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DecodeError::NotAnObject(json_kind(&other))),
        }
    }

    /// Insert path-captured values, replacing body fields of the same name.
    pub fn merge_captures<'a, I>(&mut self, captures: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in captures {
            self.fields
                .insert(name.to_string(), Value::String(value.to_string()));
        }
    }

    /// The correlation identifier, if the body carries one as a string.
    pub fn request_id(&self) -> Option<&str> {
        self.fields.get(REQUEST_ID_FIELD).and_then(Value::as_str)
    }

    /// Convert into the operation's request type.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, DecodeError> {
        serde_json::from_value(Value::Object(self.fields)).map_err(DecodeError::Schema)
    }
}

/// Decode a request body with no path captures.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    Envelope::parse(body)?.decode()
}

/// Fail unless the message carries a non-empty correlation identifier.
pub fn require_request_id<T: Correlated>(message: &T) -> Result<(), DecodeError> {
    if message.request_id().is_empty() {
        Err(DecodeError::MissingRequestId)
    } else {
        Ok(())
    }
}

/// Serialize a typed response to JSON bytes.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, EncodeError> {
    Ok(Bytes::from(serde_json::to_vec(message)?))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
