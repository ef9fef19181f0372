use axum::extract::{Path, State};
use axum::Json;
use pdl_core::cycle::StageUpdate;
use pdl_core::task::TaskSpec;
use pdl_core::types::{PdlStage, TaskStatus};

use super::sprints::StatusBody;
use super::{blocking, to_json};
use crate::error::AppError;
use crate::protocol::MessageType;
use crate::state::AppState;

/// POST /api/projects/:name/sprints/:sprint_id/cycles
pub async fn insert_cycle(
    State(app): State<AppState>,
    Path((name, sprint_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let inserted = blocking(move || engine.insert_cycle(&project, &sprint_id)).await?;
    let json = to_json(&inserted)?;
    app.announce(MessageType::PdlUpdate, &name, "insert_cycle", json.clone());
    Ok(Json(json))
}

/// POST /api/projects/:name/cycles/:cycle_id/stages/:stage
pub async fn update_stage(
    State(app): State<AppState>,
    Path((name, cycle_id, stage)): Path<(String, String, String)>,
    Json(body): Json<StageUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let updated = blocking(move || {
        let stage: PdlStage = stage.parse()?;
        engine.update_stage(&project, &cycle_id, stage, body)
    })
    .await?;
    let json = to_json(&updated)?;
    app.announce(MessageType::PdlUpdate, &name, "update_stage", json.clone());
    Ok(Json(json))
}

/// POST /api/projects/:name/cycles/:cycle_id/tasks
pub async fn insert_task(
    State(app): State<AppState>,
    Path((name, cycle_id)): Path<(String, String)>,
    Json(body): Json<TaskSpec>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.description.trim().is_empty() {
        return Err(AppError::bad_request("task description must not be empty"));
    }
    let engine = app.engine.clone();
    let project = name.clone();
    let inserted = blocking(move || engine.insert_task(&project, &cycle_id, body)).await?;
    let json = to_json(&inserted)?;
    app.announce(MessageType::PdlUpdate, &name, "insert_task", json.clone());
    Ok(Json(json))
}

/// POST /api/projects/:name/tasks/:task_id/status
pub async fn set_task_status(
    State(app): State<AppState>,
    Path((name, task_id)): Path<(String, String)>,
    Json(body): Json<StatusBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let updated = blocking(move || {
        let status: TaskStatus = body.status.parse()?;
        engine.set_task_status(&project, &task_id, status)
    })
    .await?;
    let json = to_json(&updated)?;
    app.announce(MessageType::PdlUpdate, &name, "set_task_status", json.clone());
    Ok(Json(json))
}
