use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{blocking, to_json};
use crate::error::AppError;
use crate::protocol::MessageType;
use crate::state::AppState;

/// GET /api/projects: names of every stored project.
pub async fn list_projects(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let names = blocking(move || engine.list_projects()).await?;
    Ok(Json(serde_json::json!(names)))
}

#[derive(Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vision: Option<String>,
}

/// POST /api/projects: create an empty project.
pub async fn create_project(
    State(app): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let name = body.name.clone();
    let created =
        blocking(move || engine.create_project(&body.name, body.description, body.vision)).await?;
    let json = to_json(&created)?;
    app.announce(MessageType::ProjectUpdate, &name, "create_project", json.clone());
    Ok(Json(json))
}

/// GET /api/projects/:name: the full aggregate.
pub async fn get_project(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = blocking(move || engine.project(&name)).await?;
    Ok(Json(to_json(&project)?))
}

#[derive(Deserialize)]
pub struct AddMilestoneBody {
    pub name: String,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phase_id: Option<String>,
}

/// POST /api/projects/:name/milestones
pub async fn add_milestone(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<AddMilestoneBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = app.engine.clone();
    let project = name.clone();
    let added = blocking(move || {
        engine.add_milestone(
            &project,
            &body.name,
            body.target_date,
            body.phase_id.as_deref(),
        )
    })
    .await?;
    let json = to_json(&added)?;
    app.announce(MessageType::ProjectUpdate, &name, "add_milestone", json.clone());
    Ok(Json(json))
}
