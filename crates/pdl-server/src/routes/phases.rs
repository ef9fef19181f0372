use axum::extract::{Path, Query, State};
use axum::Json;
use pdl_core::phase::PhaseSpec;
use pdl_core::types::PhaseStatus;
use serde::Deserialize;

use super::{blocking, to_json};
use crate::error::AppError;
use crate::protocol::MessageType;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InsertPhaseBody {
    #[serde(flatten)]
    pub spec: PhaseSpec,
    #[serde(default)]
    pub position: Option<usize>,
}

/// POST /api/projects/:name/phases
pub async fn insert_phase(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<InsertPhaseBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let inserted =
        blocking(move || engine.insert_phase(&project, body.spec, body.position)).await?;
    let json = to_json(&inserted)?;
    app.announce(MessageType::PhaseUpdate, &name, "insert_phase", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct ReassignQuery {
    #[serde(default)]
    pub reassign_to: Option<String>,
}

/// DELETE /api/projects/:name/phases/:phase_id?reassign_to=<phase_id>
pub async fn delete_phase(
    State(app): State<AppState>,
    Path((name, phase_id)): Path<(String, String)>,
    Query(query): Query<ReassignQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let deleted = blocking(move || {
        engine.delete_phase(&project, &phase_id, query.reassign_to.as_deref())
    })
    .await?;
    let json = to_json(&deleted)?;
    app.announce(MessageType::PhaseUpdate, &name, "delete_phase", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct OrderBody {
    pub order: Vec<String>,
}

/// PUT /api/projects/:name/phases/order
pub async fn reorder_phases(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<OrderBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let reordered = blocking(move || engine.reorder_phases(&project, &body.order)).await?;
    let json = to_json(&reordered)?;
    app.announce(MessageType::PhaseUpdate, &name, "reorder_phases", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct PhaseStatusBody {
    pub status: String,
    #[serde(default)]
    pub completion: Option<u8>,
}

/// POST /api/projects/:name/phases/:phase_id/status
pub async fn set_phase_status(
    State(app): State<AppState>,
    Path((name, phase_id)): Path<(String, String)>,
    Json(body): Json<PhaseStatusBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let updated = blocking(move || {
        let status: PhaseStatus = body.status.parse()?;
        engine.set_phase_status(&project, &phase_id, status, body.completion)
    })
    .await?;
    let json = to_json(&updated)?;
    app.announce(MessageType::PhaseUpdate, &name, "set_phase_status", json.clone());
    Ok(Json(json))
}
