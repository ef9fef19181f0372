//! Old-vocabulary endpoints: a repository holds projects, a project holds
//! phases, a phase holds steps. Each forwards through `LegacyAdapter`.

use axum::extract::{Path, Query, State};
use axum::Json;
use pdl_core::legacy::{LegacyAdapter, LegacyPhaseSpec, LegacyProjectSpec, StepSpec};
use serde::Deserialize;

use super::phases::{OrderBody, ReassignQuery};
use super::{blocking, to_json};
use crate::error::AppError;
use crate::protocol::MessageType;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InsertLegacyProjectBody {
    #[serde(flatten)]
    pub spec: LegacyProjectSpec,
    #[serde(default)]
    pub position: Option<usize>,
}

/// POST /api/legacy/:repository/projects
pub async fn insert_project(
    State(app): State<AppState>,
    Path(repository): Path<String>,
    Json(body): Json<InsertLegacyProjectBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let inserted = blocking(move || {
        LegacyAdapter::new(&engine).insert_project(&repo, body.spec, body.position)
    })
    .await?;
    let json = to_json(&inserted)?;
    app.announce(MessageType::PhaseUpdate, &repository, "insert_phase", json.clone());
    Ok(Json(json))
}

/// DELETE /api/legacy/:repository/projects/:project_id
pub async fn delete_project(
    State(app): State<AppState>,
    Path((repository, project_id)): Path<(String, String)>,
    Query(query): Query<ReassignQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let deleted = blocking(move || {
        LegacyAdapter::new(&engine).delete_project(&repo, &project_id, query.reassign_to.as_deref())
    })
    .await?;
    let json = to_json(&deleted)?;
    app.announce(MessageType::PhaseUpdate, &repository, "delete_phase", json.clone());
    Ok(Json(json))
}

/// PUT /api/legacy/:repository/projects/order
pub async fn reorder_projects(
    State(app): State<AppState>,
    Path(repository): Path<String>,
    Json(body): Json<OrderBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let reordered =
        blocking(move || LegacyAdapter::new(&engine).reorder_projects(&repo, &body.order)).await?;
    let json = to_json(&reordered)?;
    app.announce(MessageType::PhaseUpdate, &repository, "reorder_phases", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct InsertLegacyPhaseBody {
    #[serde(flatten)]
    pub spec: LegacyPhaseSpec,
    #[serde(default)]
    pub position: Option<usize>,
}

/// POST /api/legacy/:repository/projects/:project_id/phases
pub async fn insert_phase(
    State(app): State<AppState>,
    Path((repository, project_id)): Path<(String, String)>,
    Json(body): Json<InsertLegacyPhaseBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let inserted = blocking(move || {
        LegacyAdapter::new(&engine).insert_phase(&repo, &project_id, body.spec, body.position)
    })
    .await?;
    let json = to_json(&inserted)?;
    app.announce(MessageType::SprintUpdate, &repository, "insert_sprint", json.clone());
    Ok(Json(json))
}

/// DELETE /api/legacy/:repository/phases/:phase_id
pub async fn delete_phase(
    State(app): State<AppState>,
    Path((repository, phase_id)): Path<(String, String)>,
    Query(query): Query<ReassignQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let deleted = blocking(move || {
        LegacyAdapter::new(&engine).delete_phase(&repo, &phase_id, query.reassign_to.as_deref())
    })
    .await?;
    let json = to_json(&deleted)?;
    app.announce(MessageType::SprintUpdate, &repository, "delete_sprint", json.clone());
    Ok(Json(json))
}

#[derive(Deserialize)]
pub struct MovePhaseBody {
    pub to_project_id: String,
    #[serde(default)]
    pub position: Option<usize>,
}

/// POST /api/legacy/:repository/phases/:phase_id/move
pub async fn move_phase(
    State(app): State<AppState>,
    Path((repository, phase_id)): Path<(String, String)>,
    Json(body): Json<MovePhaseBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let moved = blocking(move || {
        LegacyAdapter::new(&engine).move_phase(&repo, &phase_id, &body.to_project_id, body.position)
    })
    .await?;
    let json = to_json(&moved)?;
    app.announce(MessageType::SprintUpdate, &repository, "reorder_sprints", json.clone());
    Ok(Json(json))
}

/// POST /api/legacy/:repository/phases/:phase_id/steps
pub async fn add_step(
    State(app): State<AppState>,
    Path((repository, phase_id)): Path<(String, String)>,
    Json(body): Json<StepSpec>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let repo = repository.clone();
    let added =
        blocking(move || LegacyAdapter::new(&engine).add_step(&repo, &phase_id, body)).await?;
    let json = to_json(&added)?;
    app.announce(MessageType::PdlUpdate, &repository, "insert_task", json.clone());
    Ok(Json(json))
}
