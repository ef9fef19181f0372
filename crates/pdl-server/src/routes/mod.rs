pub mod cycles;
pub mod legacy;
pub mod phases;
pub mod projects;
pub mod sprints;
pub mod storage;
pub mod ws;

use crate::error::AppError;
use pdl_core::PdlError;

/// Run blocking engine work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PdlError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(result)
}

/// Serialize an operation result for both the HTTP response and the broadcast.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::to_value(value)?)
}
