use crate::error::PdlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Implements `as_str`, `all`, `Display` and `FromStr` for a snake_case status enum.
macro_rules! status_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $name {
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = PdlError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($name::$variant),)+
                    other => Err(PdlError::InvalidStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// PhaseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

status_enum!(PhaseStatus, "phase", {
    NotStarted => "not_started",
    InProgress => "in_progress",
    Completed => "completed",
    Blocked => "blocked",
});

// ---------------------------------------------------------------------------
// SprintStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    #[default]
    Planning,
    Active,
    Completed,
    Cancelled,
}

status_enum!(SprintStatus, "sprint", {
    Planning => "planning",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

status_enum!(TaskStatus, "task", {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
    Blocked => "blocked",
});

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

status_enum!(StageStatus, "stage", {
    NotStarted => "not_started",
    InProgress => "in_progress",
    Completed => "completed",
    Blocked => "blocked",
});

// ---------------------------------------------------------------------------
// PdlStage
// ---------------------------------------------------------------------------

/// The seven stages every PDL cycle passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdlStage {
    Discovery,
    Definition,
    Design,
    Development,
    Testing,
    Launch,
    Growth,
}

impl PdlStage {
    pub fn all() -> &'static [PdlStage] {
        &[
            PdlStage::Discovery,
            PdlStage::Definition,
            PdlStage::Design,
            PdlStage::Development,
            PdlStage::Testing,
            PdlStage::Launch,
            PdlStage::Growth,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PdlStage::Discovery => "discovery",
            PdlStage::Definition => "definition",
            PdlStage::Design => "design",
            PdlStage::Development => "development",
            PdlStage::Testing => "testing",
            PdlStage::Launch => "launch",
            PdlStage::Growth => "growth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PdlStage::Discovery => "Discovery",
            PdlStage::Definition => "Definition",
            PdlStage::Design => "Design",
            PdlStage::Development => "Development",
            PdlStage::Testing => "Testing",
            PdlStage::Launch => "Launch",
            PdlStage::Growth => "Growth",
        }
    }
}

impl fmt::Display for PdlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PdlStage {
    type Err = PdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        PdlStage::all()
            .iter()
            .copied()
            .find(|stage| stage.as_str() == lower)
            .ok_or_else(|| PdlError::InvalidStage(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
