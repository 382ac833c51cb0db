//! Deadline for record store calls made while a client is waiting.

use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::error;

use crate::error::AppError;

/// Runs a store call, failing with [`AppError::Internal`] if it does not
/// finish within `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            error!(operation, timeout_ms = limit.as_millis() as u64, "Record store call timed out");
            Err(AppError::internal(
                "Record store timed out",
                json!({ "operation": operation, "timeout_ms": limit.as_millis() as u64 }),
            ))
        }
    }
}
