use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who originated a [`ChatMessage`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    User,
    Agent,
}

/// Lifecycle state of a user-originated message; agent-originated messages omit status
/// entirely (see §3), modeled here as `Option<MessageStatus>` on
/// [`ChatMessage`] rather than as a variant of this enum.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Responded,
    Ignored,
}

/// A single chat message, either a user message addressed to the room or a specific agent, or
/// an agent's reply. Shaped like the small, flat, fully-`Serialize`/`Deserialize` event structs
/// (`FillEvent`, `MarketEvent`) used elsewhere in this crate rather than any dedicated chat type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub target_agent_id: Option<String>,
    pub target_agent_name: Option<String>,
    pub content: String,
    pub round_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: Option<MessageStatus>,
}

impl ChatMessage {
    pub fn new_user(
        sender_name: impl Into<String>,
        target_agent_id: Option<String>,
        target_agent_name: Option<String>,
        content: impl Into<String>,
        round_id: impl Into<String>,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_type: SenderType::User,
            sender_name: sender_name.into(),
            target_agent_id,
            target_agent_name,
            content: content.into(),
            round_id: round_id.into(),
            created_at,
            status: Some(MessageStatus::Pending),
        }
    }

    pub fn new_agent_reply(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        content: impl Into<String>,
        round_id: impl Into<String>,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let agent_id = agent_id.into();
        Self {
            id: Uuid::new_v4(),
            sender_type: SenderType::Agent,
            sender_name: agent_name.into(),
            target_agent_id: Some(agent_id),
            target_agent_name: None,
            content: content.into(),
            round_id: round_id.into(),
            created_at,
            status: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, Some(MessageStatus::Pending))
    }

    pub fn is_delivered_for_round(&self, round_id: &str) -> bool {
        matches!(self.status, Some(MessageStatus::Delivered)) && self.round_id == round_id
    }
}

/// Chat configuration and message log for one simulation instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatState {
    pub enabled: bool,
    pub max_messages_per_agent: usize,
    pub max_messages_per_user: usize,
    pub max_message_length: usize,
    pub messages: Vec<ChatMessage>,
}

impl ChatState {
    pub fn new(enabled: bool, max_messages_per_agent: usize, max_messages_per_user: usize, max_message_length: usize) -> Self {
        Self {
            enabled,
            max_messages_per_agent,
            max_messages_per_user,
            max_message_length,
            messages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn new_user_message_starts_pending() {
        let message = ChatMessage::new_user("alice", None, None, "hello", "1-0.000", Utc::now());
        assert!(message.is_pending());
    }

    #[test]
    fn agent_reply_has_no_status() {
        let message = ChatMessage::new_agent_reply("agent-1", "Agent One", "hi", "1-0.000", Utc::now());
        assert!(message.status.is_none());
    }

    #[test]
    fn is_delivered_for_round_checks_both_status_and_round() {
        let mut message = ChatMessage::new_user("alice", None, None, "hi", "1-0.000", Utc::now());
        message.status = Some(MessageStatus::Delivered);
        assert!(message.is_delivered_for_round("1-0.000"));
        assert!(!message.is_delivered_for_round("1-2.000"));
    }
}
