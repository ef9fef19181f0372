use crate::task::Task;
use crate::types::{PdlStage, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StageState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub stage: PdlStage,
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default)]
    pub completion: u8,
    #[serde(default)]
    pub blockers: Vec<String>,
}

impl StageState {
    pub fn new(stage: PdlStage) -> Self {
        Self {
            stage,
            status: StageStatus::NotStarted,
            completion: 0,
            blockers: Vec::new(),
        }
    }
}

/// Partial update for one stage; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageUpdate {
    #[serde(default)]
    pub status: Option<StageStatus>,
    #[serde(default)]
    pub completion: Option<u8>,
    #[serde(default)]
    pub blockers: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// PdlCycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdlCycle {
    pub id: String,
    pub cycle_number: u32,
    pub stages: Vec<StageState>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
}

impl PdlCycle {
    /// A fresh cycle with all seven stages not started.
    pub fn new() -> Self {
        Self {
            id: crate::new_id("cycle"),
            cycle_number: 0,
            stages: PdlStage::all().iter().copied().map(StageState::new).collect(),
            tasks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn stage_mut(&mut self, stage: PdlStage) -> &mut StageState {
        // Documents written before a stage existed get it back on first touch.
        if let Some(i) = self.stages.iter().position(|s| s.stage == stage) {
            return &mut self.stages[i];
        }
        self.stages.push(StageState::new(stage));
        self.stages.sort_by_key(|s| s.stage);
        let i = self
            .stages
            .iter()
            .position(|s| s.stage == stage)
            .unwrap_or(0);
        &mut self.stages[i]
    }

    pub fn apply_stage_update(&mut self, stage: PdlStage, update: StageUpdate) {
        let state = self.stage_mut(stage);
        if let Some(status) = update.status {
            state.status = status;
            if status == StageStatus::Completed {
                state.completion = 100;
            }
        }
        if let Some(completion) = update.completion {
            state.completion = completion.min(100);
        }
        if let Some(blockers) = update.blockers {
            state.blockers = blockers;
        }
    }

    /// First stage that is not completed, if any.
    pub fn current_stage(&self) -> Option<PdlStage> {
        self.stages
            .iter()
            .find(|s| s.status != StageStatus::Completed)
            .map(|s| s.stage)
    }
}

impl Default for PdlCycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cycle_has_seven_stages() {
        let c = PdlCycle::new();
        assert_eq!(c.stages.len(), 7);
        assert_eq!(c.current_stage(), Some(PdlStage::Discovery));
    }

    #[test]
    fn completing_stage_advances_current() {
        let mut c = PdlCycle::new();
        c.apply_stage_update(
            PdlStage::Discovery,
            StageUpdate {
                status: Some(StageStatus::Completed),
                ..Default::default()
            },
        );
        assert_eq!(c.stages[0].completion, 100);
        assert_eq!(c.current_stage(), Some(PdlStage::Definition));
    }

    #[test]
    fn completion_is_clamped() {
        let mut c = PdlCycle::new();
        c.apply_stage_update(
            PdlStage::Design,
            StageUpdate {
                completion: Some(250),
                blockers: Some(vec!["waiting on brand review".into()]),
                ..Default::default()
            },
        );
        let design = c.stage_mut(PdlStage::Design);
        assert_eq!(design.completion, 100);
        assert_eq!(design.blockers.len(), 1);
    }

    #[test]
    fn missing_stage_is_restored_in_order() {
        let mut c = PdlCycle::new();
        c.stages.retain(|s| s.stage != PdlStage::Launch);
        c.stage_mut(PdlStage::Launch).completion = 10;
        let order: Vec<PdlStage> = c.stages.iter().map(|s| s.stage).collect();
        assert_eq!(order, PdlStage::all());
    }
}
