//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (per-method route lookup, registration order)
//!     → matcher.rs (run compiled template against path segments)
//!     → Return: matched Route + Captures, MethodNotAllowed, or NotFound
//!
//! Route Compilation (at startup):
//!     built-in operations + [[routes]] from config
//!     → Pattern::compile (literal / capture instructions + end assertion)
//!     → RouteTable::register (duplicate shapes are fatal)
//!     → Freeze as immutable RouteTable behind Arc
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (positional segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod operation;
pub mod router;

pub use matcher::{Captures, Instruction, Pattern, PatternError};
pub use operation::{Operation, OperationId};
pub use router::{Resolution, Route, RouteError, RouteTable};
