use crate::sprint::Sprint;
use crate::types::PhaseStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub phase_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub status: PhaseStatus,
    #[serde(default)]
    pub completion: u8,
    pub duration_weeks: u32,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sprints: Vec<Sprint>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

/// Caller-supplied fields for a new phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub phase_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub duration_weeks: Option<u32>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

impl Phase {
    pub fn from_spec(spec: PhaseSpec, default_weeks: u32) -> Self {
        Self {
            id: crate::new_id("phase"),
            phase_name: spec.phase_name,
            description: spec.description,
            objective: spec.objective,
            status: PhaseStatus::NotStarted,
            completion: 0,
            duration_weeks: spec.duration_weeks.unwrap_or(default_weeks),
            start_date: None,
            end_date: None,
            sprints: Vec::new(),
            deliverables: spec.deliverables,
            success_metrics: spec.success_metrics,
        }
    }

    /// Completed phases with a recorded end date keep their own window.
    pub fn is_date_anchor(&self) -> bool {
        self.status == PhaseStatus::Completed && self.end_date.is_some()
    }
}
