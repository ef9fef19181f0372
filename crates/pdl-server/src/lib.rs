pub mod error;
pub mod hub;
pub mod protocol;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Broadcast
        .route("/api/ws", get(routes::ws::ws_handler))
        // Storage diagnostics
        .route("/api/storage", get(routes::storage::get_storage))
        // Projects
        .route("/api/projects", get(routes::projects::list_projects))
        .route("/api/projects", post(routes::projects::create_project))
        .route("/api/projects/{name}", get(routes::projects::get_project))
        .route(
            "/api/projects/{name}/milestones",
            post(routes::projects::add_milestone),
        )
        // Phases
        .route(
            "/api/projects/{name}/phases",
            post(routes::phases::insert_phase),
        )
        .route(
            "/api/projects/{name}/phases/order",
            put(routes::phases::reorder_phases),
        )
        .route(
            "/api/projects/{name}/phases/{phase_id}",
            delete(routes::phases::delete_phase),
        )
        .route(
            "/api/projects/{name}/phases/{phase_id}/status",
            post(routes::phases::set_phase_status),
        )
        // Sprints
        .route(
            "/api/projects/{name}/phases/{phase_id}/sprints",
            post(routes::sprints::insert_sprint),
        )
        .route(
            "/api/projects/{name}/phases/{phase_id}/sprints/order",
            put(routes::sprints::order_sprints),
        )
        .route(
            "/api/projects/{name}/sprints/moves",
            post(routes::sprints::reorder_sprints),
        )
        .route(
            "/api/projects/{name}/sprints/{sprint_id}",
            delete(routes::sprints::delete_sprint),
        )
        .route(
            "/api/projects/{name}/sprints/{sprint_id}/status",
            post(routes::sprints::set_sprint_status),
        )
        // Cycles, stages, tasks
        .route(
            "/api/projects/{name}/sprints/{sprint_id}/cycles",
            post(routes::cycles::insert_cycle),
        )
        .route(
            "/api/projects/{name}/cycles/{cycle_id}/stages/{stage}",
            post(routes::cycles::update_stage),
        )
        .route(
            "/api/projects/{name}/cycles/{cycle_id}/tasks",
            post(routes::cycles::insert_task),
        )
        .route(
            "/api/projects/{name}/tasks/{task_id}/status",
            post(routes::cycles::set_task_status),
        )
        // Legacy vocabulary
        .route(
            "/api/legacy/{repository}/projects",
            post(routes::legacy::insert_project),
        )
        .route(
            "/api/legacy/{repository}/projects/order",
            put(routes::legacy::reorder_projects),
        )
        .route(
            "/api/legacy/{repository}/projects/{project_id}",
            delete(routes::legacy::delete_project),
        )
        .route(
            "/api/legacy/{repository}/projects/{project_id}/phases",
            post(routes::legacy::insert_phase),
        )
        .route(
            "/api/legacy/{repository}/phases/{phase_id}",
            delete(routes::legacy::delete_phase),
        )
        .route(
            "/api/legacy/{repository}/phases/{phase_id}/move",
            post(routes::legacy::move_phase),
        )
        .route(
            "/api/legacy/{repository}/phases/{phase_id}/steps",
            post(routes::legacy::add_step),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve on a pre-bound listener so the caller can read the actual port
/// first (useful when `port = 0` and the OS picks a free port). Starts the
/// heartbeat and the external-change watcher.
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    app_state.spawn_background();
    let app = build_router(app_state);

    tracing::info!("pdl server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
