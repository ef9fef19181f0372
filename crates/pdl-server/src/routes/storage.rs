use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/storage: which backend is bound and why.
pub async fn get_storage(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut info = serde_json::to_value(app.storage.as_ref())?;
    info["observers"] = serde_json::json!(app.hub.connection_count());
    Ok(Json(info))
}
