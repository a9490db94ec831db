//! Request/response messages of the `faiss.FaissService` RPC contract.
//!
//! One struct per message serves both wire formats: `prost` drives the
//! protobuf encoding towards the backend and `serde` drives the JSON
//! surface. JSON field names are the protobuf field names.

use serde::{Deserialize, Serialize};

use crate::codec::json::{base64_bytes, lenient_i64, lenient_u64};

/// Messages that carry a caller-supplied correlation identifier.
pub trait Correlated {
    fn request_id(&self) -> &str;
    fn set_request_id(&mut self, request_id: String);
}

/// Responses that carry a status code (0 = success).
pub trait Status {
    fn error_code(&self) -> i64;
}

macro_rules! correlated {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Correlated for $ty {
                fn request_id(&self) -> &str {
                    &self.request_id
                }

                fn set_request_id(&mut self, request_id: String) {
                    self.request_id = request_id;
                }
            }
        )+
    };
}

macro_rules! status {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Status for $ty {
                fn error_code(&self) -> i64 {
                    self.error_code
                }
            }
        )+
    };
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct PingRequest {
    #[prost(string, tag = "1")]
    pub payload: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct PingResponse {
    #[prost(string, tag = "1")]
    pub payload: String,
}

/// Create a database backed by a pre-trained index model.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct DbNewRequest {
    #[prost(string, tag = "1")]
    pub db_name: String,
    /// Capacity limit in vectors.
    #[prost(uint64, tag = "2")]
    #[serde(with = "lenient_u64")]
    pub max_size: u64,
    /// Model (trained index file) identifier.
    #[prost(string, tag = "3")]
    pub model: String,
    #[prost(string, tag = "4")]
    pub request_id: String,
}

/// Status-only reply shared by db/new, db/del and hdel.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct EmptyResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(int64, tag = "2")]
    #[serde(with = "lenient_i64")]
    pub error_code: i64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct DbListRequest {
    #[prost(string, tag = "1")]
    pub request_id: String,
}

#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct DbStatus {
    #[prost(string, tag = "1")]
    pub db_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "lenient_u64")]
    pub max_size: u64,
    /// Number of vectors currently stored.
    #[prost(uint64, tag = "3")]
    #[serde(with = "lenient_u64")]
    pub curr_size: u64,
    #[prost(string, tag = "4")]
    pub model: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct DbListResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(int64, tag = "2")]
    #[serde(with = "lenient_i64")]
    pub error_code: i64,
    #[prost(message, repeated, tag = "3")]
    pub db_status: Vec<DbStatus>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct DbDelRequest {
    #[prost(string, tag = "1")]
    pub db_name: String,
    #[prost(string, tag = "2")]
    pub request_id: String,
}

/// Insert one feature vector.
///
/// `feature` is opaque to the gateway; the backend reads it as
/// little-endian `f32` values, one per dimension.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HSetRequest {
    #[prost(string, tag = "1")]
    pub db_name: String,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(with = "base64_bytes")]
    pub feature: Vec<u8>,
    #[prost(string, tag = "3")]
    pub request_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HSetResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(int64, tag = "2")]
    #[serde(with = "lenient_i64")]
    pub error_code: i64,
    /// Identifier assigned by the backend.
    #[prost(uint64, tag = "3")]
    #[serde(with = "lenient_u64")]
    pub id: u64,
}

/// Address one stored vector; used by both hget and hdel.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HGetDelRequest {
    #[prost(string, tag = "1")]
    pub db_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "lenient_u64")]
    pub id: u64,
    #[prost(string, tag = "3")]
    pub request_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HGetResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(int64, tag = "2")]
    #[serde(with = "lenient_i64")]
    pub error_code: i64,
    #[prost(uint64, tag = "3")]
    #[serde(with = "lenient_u64")]
    pub dimension: u64,
    #[prost(bytes = "vec", tag = "4")]
    #[serde(with = "base64_bytes")]
    pub feature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HSearchRequest {
    #[prost(string, tag = "1")]
    pub db_name: String,
    /// Query vector, same layout as [`HSetRequest::feature`].
    #[prost(bytes = "vec", tag = "2")]
    #[serde(with = "base64_bytes")]
    pub feature: Vec<u8>,
    #[prost(string, tag = "3")]
    pub request_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    #[prost(uint64, tag = "1")]
    #[serde(with = "lenient_u64")]
    pub id: u64,
    #[prost(float, tag = "2")]
    pub distance: f32,
}

/// Search hits, nearest first.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HSearchResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(int64, tag = "2")]
    #[serde(with = "lenient_i64")]
    pub error_code: i64,
    #[prost(message, repeated, tag = "3")]
    pub results: Vec<SearchResult>,
}

correlated!(
    DbNewRequest,
    EmptyResponse,
    DbListRequest,
    DbListResponse,
    DbDelRequest,
    HSetRequest,
    HSetResponse,
    HGetDelRequest,
    HGetResponse,
    HSearchRequest,
    HSearchResponse,
);

status!(EmptyResponse, DbListResponse, HSetResponse, HGetResponse, HSearchResponse);
