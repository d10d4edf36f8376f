//! Deadline wrapper for collaborator calls.

use std::future::Future;
use std::time::Duration;

use crate::error::AgentError;

/// Awaits `fut`, converting expiry of `limit` into [`AgentError::Timeout`].
///
/// A zero `limit` disables the deadline.
///
/// # Errors
///
/// Returns the future's own error, or [`AgentError::Timeout`] on expiry.
pub async fn with_timeout<T, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    if limit.is_zero() {
        return fut.await;
    }
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AgentError::Timeout {
            operation,
            elapsed: limit,
        })?
}
