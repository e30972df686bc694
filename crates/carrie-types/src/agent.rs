//! Deployed agent records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a deployed agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Token issued, agent not yet in the room.
    #[default]
    Pending,
    /// Agent has joined its room.
    Active,
    /// Agent has been removed.
    Disconnected,
}

impl AgentStatus {
    /// Returns the canonical string label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown agent status string.
#[derive(Debug, Clone, Error)]
#[error("unknown agent status: {0}")]
pub struct ParseAgentStatusError(pub String);

impl std::str::FromStr for AgentStatus {
    type Err = ParseAgentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "disconnected" => Ok(Self::Disconnected),
            _ => Err(ParseAgentStatusError(s.to_string())),
        }
    }
}

/// An AI agent bound to a realtime room.
///
/// Records are owned by the agent registry; everything else works on clones.
/// The join token is never serialized into API responses.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInstance {
    pub id: String,
    pub room_name: String,
    pub identity: String,
    #[serde(skip_serializing, default)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub status: AgentStatus,
}

impl fmt::Debug for AgentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentInstance")
            .field("id", &self.id)
            .field("room_name", &self.room_name)
            .field("identity", &self.identity)
            .field("token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("status", &self.status)
            .finish()
    }
}
