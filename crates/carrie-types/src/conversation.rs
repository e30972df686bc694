//! Conversation turns exchanged with the agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single utterance in a conversation.
///
/// Turns are not persisted here. `conversation_id` is the vendor's
/// correlation id: absent on the first turn, then threaded through every
/// later call so the hosted agent keeps its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ConversationTurn {
    /// Creates a turn stamped with the current time.
    pub fn now(role: Role, text: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
            conversation_id,
        }
    }
}
