//! Broadcast wire format: one JSON object per WebSocket text frame.
//!
//! ```json
//! {"type": "phase_update", "payload": {...}, "timestamp": "...",
//!  "project_name": "alpha", "session_id": "..."}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Subscribe,
    Unsubscribe,
    PdlUpdate,
    ProjectUpdate,
    PhaseUpdate,
    SprintUpdate,
    LogUpdate,
    Error,
    Ping,
    Pong,
}

impl MessageType {
    pub fn all() -> &'static [MessageType] {
        &[
            MessageType::Subscribe,
            MessageType::Unsubscribe,
            MessageType::PdlUpdate,
            MessageType::ProjectUpdate,
            MessageType::PhaseUpdate,
            MessageType::SprintUpdate,
            MessageType::LogUpdate,
            MessageType::Error,
            MessageType::Ping,
            MessageType::Pong,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Subscribe => "subscribe",
            MessageType::Unsubscribe => "unsubscribe",
            MessageType::PdlUpdate => "pdl_update",
            MessageType::ProjectUpdate => "project_update",
            MessageType::PhaseUpdate => "phase_update",
            MessageType::SprintUpdate => "sprint_update",
            MessageType::LogUpdate => "log_update",
            MessageType::Error => "error",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unknown message type '{0}'")]
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl WireMessage {
    pub fn new(kind: MessageType, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
            project_name: None,
            session_id: None,
        }
    }

    pub fn for_project(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            MessageType::Error,
            serde_json::json!({ "message": message.into() }),
        )
    }

    pub fn ping() -> Self {
        Self::new(MessageType::Ping, serde_json::Value::Null)
    }

    /// Parse a client frame. The `type` field is checked first so that an
    /// unrecognised type is reported as such rather than as malformed JSON.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ProtocolError::Malformed("missing 'type' field".to_string()))?;
        kind.parse::<MessageType>()?;
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn encode(&self) -> String {
        // A WireMessage always serializes: every field is plain data.
        serde_json::to_string(self).unwrap_or_default()
    }
}
