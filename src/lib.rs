//! HTTP/JSON gateway for the FAISS vector service.
//!
//! Clients POST JSON to `/<namespace>/<version>/<operation>`; the gateway
//! matches the path against its route table, decodes the body into the
//! operation's typed request, calls the backend over gRPC and encodes the
//! typed response back to JSON.

pub mod backend;
pub mod codec;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
