use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pdl_core::error::PdlError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }
}

/// Carries an explicit 400 through the `anyhow::Error` chain.
#[derive(Debug)]
struct BadRequest(String);

impl std::fmt::Display for BadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequest {}

fn status_for(e: &PdlError) -> StatusCode {
    match e {
        PdlError::ProjectNotFound(_)
        | PdlError::PhaseNotFound(_)
        | PdlError::SprintNotFound(_)
        | PdlError::CycleNotFound(_)
        | PdlError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        PdlError::ProjectExists(_) => StatusCode::CONFLICT,
        PdlError::InvalidName(_) | PdlError::InvalidStatus { .. } | PdlError::InvalidStage(_) => {
            StatusCode::BAD_REQUEST
        }
        PdlError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PdlError::Storage(_)
        | PdlError::Migration(_)
        | PdlError::HomeNotFound
        | PdlError::Io(_)
        | PdlError::Yaml(_)
        | PdlError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequest>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<PdlError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
