use crate::types::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub story_points: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields for a new task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub story_points: u32,
}

impl Task {
    pub fn from_spec(spec: TaskSpec) -> Self {
        Self {
            id: crate::new_id("task"),
            description: spec.description,
            assignee: spec.assignee,
            status: TaskStatus::Todo,
            story_points: spec.story_points,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Done => Some(self.completed_at.unwrap_or_else(Utc::now)),
            _ => None,
        };
    }
}

/// Story points not yet done. Saturates at `u32::MAX`.
pub fn remaining_points<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u32 {
    tasks
        .into_iter()
        .filter(|t| t.status != TaskStatus::Done)
        .fold(0, |acc, t| acc.saturating_add(t.story_points))
}

/// Human-readable summary: "3/5 done, 1 in progress, 1 blocked"
pub fn summarize(tasks: &[Task]) -> String {
    let total = tasks.len();
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let in_progress = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    let blocked = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Blocked)
        .count();
    format!("{done}/{total} done, {in_progress} in progress, {blocked} blocked")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(points: u32) -> Task {
        Task::from_spec(TaskSpec {
            description: "write tests".into(),
            assignee: None,
            story_points: points,
        })
    }

    #[test]
    fn done_stamps_completion_once() {
        let mut t = task(3);
        t.set_status(TaskStatus::Done);
        let first = t.completed_at.unwrap();
        t.set_status(TaskStatus::Done);
        assert_eq!(t.completed_at, Some(first));

        t.set_status(TaskStatus::InProgress);
        assert!(t.completed_at.is_none());
    }

    #[test]
    fn remaining_excludes_done() {
        let mut a = task(3);
        let b = task(5);
        a.set_status(TaskStatus::Done);
        assert_eq!(remaining_points([&a, &b]), 5);
    }

    #[test]
    fn remaining_saturates_instead_of_overflowing() {
        let big = task(1 << 31);
        let other = task(1 << 31);
        assert_eq!(remaining_points([&big, &other]), u32::MAX);
    }

    #[test]
    fn summary_counts() {
        let mut tasks = vec![task(1), task(2), task(3)];
        tasks[0].set_status(TaskStatus::Done);
        tasks[1].set_status(TaskStatus::Blocked);
        assert_eq!(summarize(&tasks), "1/3 done, 0 in progress, 1 blocked");
    }
}
