//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing span, limits)
//!     → dispatcher.rs (route → decode → backend call → encode)
//!         → request.rs (bounded body read)
//!         → response.rs (JSON body or error envelope)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{DispatchPolicy, Dispatcher, Stage};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ErrorBody, GatewayError};
pub use server::HttpServer;
