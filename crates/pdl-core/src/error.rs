use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdlError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("phase not found: {0}")]
    PhaseNotFound(String),

    #[error("sprint not found: {0}")]
    SprintNotFound(String),

    #[error("cycle not found: {0}")]
    CycleNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid project name '{0}': must be lowercase alphanumeric with '-' or '_'")]
    InvalidName(String),

    #[error("invalid status '{value}' for {kind}")]
    InvalidStatus { kind: &'static str, value: String },

    #[error("invalid stage: {0}")]
    InvalidStage(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PdlError {
    /// True for the "identifier absent" family: project, phase, sprint, cycle, task.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PdlError::ProjectNotFound(_)
                | PdlError::PhaseNotFound(_)
                | PdlError::SprintNotFound(_)
                | PdlError::CycleNotFound(_)
                | PdlError::TaskNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PdlError>;
