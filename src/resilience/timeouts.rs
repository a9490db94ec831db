//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a deadline
//! - Cancel the wrapped future when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::backend::BackendError;

/// Run `fut` with a deadline; a late completion becomes [`BackendError::Timeout`].
///
/// The future is dropped when the deadline passes.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| BackendError::Timeout(deadline))
}
