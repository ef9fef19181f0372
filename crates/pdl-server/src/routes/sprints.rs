use axum::extract::{Path, Query, State};
use axum::Json;
use pdl_core::engine::SprintMove;
use pdl_core::sprint::SprintSpec;
use pdl_core::types::SprintStatus;
use serde::Deserialize;

use super::phases::{OrderBody, ReassignQuery};
use super::{blocking, to_json};
use crate::error::AppError;
use crate::protocol::MessageType;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InsertSprintBody {
    #[serde(flatten)]
    pub spec: SprintSpec,
    #[serde(default)]
    pub position: Option<usize>,
}

/// POST /api/projects/:name/phases/:phase_id/sprints
pub async fn insert_sprint(
    State(app): State<AppState>,
    Path((name, phase_id)): Path<(String, String)>,
    Json(body): Json<InsertSprintBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let inserted = blocking(move || {
        engine.insert_sprint(&project, &phase_id, body.spec, body.position)
    })
    .await?;
    let json = to_json(&inserted)?;
    app.announce(MessageType::SprintUpdate, &name, "insert_sprint", json.clone());
    Ok(Json(json))
}

/// DELETE /api/projects/:name/sprints/:sprint_id?reassign_to=<sprint_id>
pub async fn delete_sprint(
    State(app): State<AppState>,
    Path((name, sprint_id)): Path<(String, String)>,
    Query(query): Query<ReassignQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let deleted = blocking(move || {
        engine.delete_sprint(&project, &sprint_id, query.reassign_to.as_deref())
    })
    .await?;
    let json = to_json(&deleted)?;
    app.announce(MessageType::SprintUpdate, &name, "delete_sprint", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct MovesBody {
    pub moves: Vec<SprintMove>,
}

/// POST /api/projects/:name/sprints/moves
pub async fn reorder_sprints(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MovesBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.moves.is_empty() {
        return Err(AppError::bad_request("moves must not be empty"));
    }
    let engine = app.engine.clone();
    let project = name.clone();
    let moved = blocking(move || engine.reorder_sprints(&project, &body.moves)).await?;
    let json = to_json(&moved)?;
    app.announce(MessageType::SprintUpdate, &name, "reorder_sprints", json.clone());
    Ok(Json(json))
}

/// PUT /api/projects/:name/phases/:phase_id/sprints/order
pub async fn order_sprints(
    State(app): State<AppState>,
    Path((name, phase_id)): Path<(String, String)>,
    Json(body): Json<OrderBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let reordered =
        blocking(move || engine.order_sprints(&project, &phase_id, &body.order)).await?;
    let json = to_json(&reordered)?;
    app.announce(MessageType::SprintUpdate, &name, "order_sprints", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// POST /api/projects/:name/sprints/:sprint_id/status
pub async fn set_sprint_status(
    State(app): State<AppState>,
    Path((name, sprint_id)): Path<(String, String)>,
    Json(body): Json<StatusBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let updated = blocking(move || {
        let status: SprintStatus = body.status.parse()?;
        engine.set_sprint_status(&project, &sprint_id, status)
    })
    .await?;
    let json = to_json(&updated)?;
    app.announce(MessageType::SprintUpdate, &name, "set_sprint_status", json.clone());
    Ok(Json(json))
}
