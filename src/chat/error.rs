use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors rejecting an incoming chat message before it ever becomes a [`super::message::ChatMessage`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("chat is disabled for this simulation")]
    Disabled,

    #[error("username is empty after sanitization")]
    EmptyUsername,

    #[error("message content is empty after sanitization")]
    EmptyContent,

    #[error("message content looks like spam (contains a URL or domain)")]
    SpamDetected,

    #[error("user '{username}' has reached the per-round message quota")]
    UserQuotaExceeded { username: String },

    #[error("agent '{agent_id}' has reached the per-round message quota")]
    AgentQuotaExceeded { agent_id: String },

    #[error("target agent '{agent_id}' does not exist in this simulation")]
    UnknownAgent { agent_id: String },
}

impl ErrorKind for ChatError {
    fn kind(&self) -> Kind {
        match self {
            ChatError::Disabled => Kind::Forbidden,
            ChatError::EmptyUsername
            | ChatError::EmptyContent
            | ChatError::SpamDetected
            | ChatError::UserQuotaExceeded { .. }
            | ChatError::AgentQuotaExceeded { .. } => Kind::InvalidArgument,
            ChatError::UnknownAgent { .. } => Kind::NotFound,
        }
    }
}
