//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce the backend-call deadline)
//!     → On timeout: request fails with DeadlineExceeded, future dropped
//! ```
//!
//! Body reads are bounded separately, in `http::request::read_body`.
//!
//! # Design Decisions
//! - Every backend call has a deadline
//! - No automatic retries: db/new, db/del, hset and hdel change backend
//!   state and are not idempotent, so retrying is left to the caller

pub mod timeouts;
