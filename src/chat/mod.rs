//! Chat subsystem: sanitized, quota-checked user messages fed into each trade window, and
//! agent replies fed back out. See §4.7.

pub mod error;
pub mod message;
pub mod round;
pub mod sanitize;

use chrono::{DateTime, Utc};

pub use error::ChatError;
pub use message::{ChatMessage, ChatState, MessageStatus, SenderType};
pub use round::SessionKind;

/// Submits a new user message, sanitizing its username/content, rejecting spam, enforcing
/// per-round quotas, and assigning it to a target round via [`round::assign_target_round`].
/// Returns the appended [`ChatMessage`] on success.
#[allow(clippy::too_many_arguments)]
pub fn submit_message(
    state: &mut ChatState,
    username: &str,
    target_agent_id: Option<String>,
    target_agent_name: Option<String>,
    content: &str,
    day: u64,
    intraday_hour: f64,
    trade_interval_hours: f64,
    seconds_until_next_round: f64,
    session_kind: SessionKind,
    now: DateTime<Utc>,
) -> Result<ChatMessage, ChatError> {
    if !state.enabled {
        return Err(ChatError::Disabled);
    }

    let username = sanitize::sanitize_username(username)?;
    let content = sanitize::sanitize_content(content, state.max_message_length)?;

    let (round_day, round_hour) = round::assign_target_round(
        day,
        intraday_hour,
        trade_interval_hours,
        seconds_until_next_round,
        session_kind,
    );
    let round_id = round::format_round_id(round_day, round_hour);

    let user_count_this_round = state
        .messages
        .iter()
        .filter(|m| {
            m.sender_type == SenderType::User
                && m.round_id == round_id
                && m.sender_name.eq_ignore_ascii_case(&username)
        })
        .count();
    if user_count_this_round >= state.max_messages_per_user {
        return Err(ChatError::UserQuotaExceeded { username });
    }

    if let Some(agent_id) = &target_agent_id {
        let agent_count_this_round = state
            .messages
            .iter()
            .filter(|m| {
                m.sender_type == SenderType::User
                    && m.round_id == round_id
                    && m.target_agent_id.as_deref() == Some(agent_id.as_str())
            })
            .count();
        if agent_count_this_round >= state.max_messages_per_agent {
            return Err(ChatError::AgentQuotaExceeded {
                agent_id: agent_id.clone(),
            });
        }
    }

    let message = ChatMessage::new_user(username, target_agent_id, target_agent_name, content, round_id, now);
    state.messages.push(message.clone());
    Ok(message)
}

/// Step 1 of the outgoing flow: transitions every `pending` message to `delivered`, stamping it
/// with the current round id regardless of what round it was originally targeted at.
pub fn deliver_pending(state: &mut ChatState, current_round_id: &str) {
    for message in state.messages.iter_mut() {
        if message.is_pending() {
            message.status = Some(MessageStatus::Delivered);
            message.round_id = current_round_id.to_string();
        }
    }
}

/// Step 2: messages delivered this round directed at `agent_id`, capped at
/// `max_messages_per_agent`.
pub fn messages_for_agent(state: &ChatState, agent_id: &str, current_round_id: &str) -> Vec<ChatMessage> {
    state
        .messages
        .iter()
        .filter(|m| {
            m.is_delivered_for_round(current_round_id) && m.target_agent_id.as_deref() == Some(agent_id)
        })
        .take(state.max_messages_per_agent)
        .cloned()
        .collect()
}

/// Step 3: sanitizes an agent's raw reply, prefixes it with `@user` mentions for each unique
/// sender that targeted the agent this round, and trims to the message-length budget. Returns
/// `None` if the content is empty after sanitization/trimming (the reply is dropped entirely).
pub fn prepare_agent_reply(state: &ChatState, raw_reply: &str, unique_senders: &[String]) -> Option<String> {
    let stripped = sanitize::strip_urls(raw_reply);
    let trimmed_input = stripped.trim();
    if trimmed_input.is_empty() {
        return None;
    }

    let mention_prefix = unique_senders
        .iter()
        .map(|sender| format!("@{sender}"))
        .collect::<Vec<_>>()
        .join(" ");

    let budget = state.max_message_length.saturating_sub(mention_prefix.len() + 1);
    let body: String = trimmed_input.chars().take(budget).collect();
    let body = body.trim();

    if body.is_empty() {
        return None;
    }

    Some(if mention_prefix.is_empty() {
        body.to_string()
    } else {
        format!("{mention_prefix} {body}")
    })
}

/// Step 4: if an agent message for `(agent_id, round_id)` already exists, replace its content;
/// otherwise append a new one.
pub fn upsert_agent_reply(
    state: &mut ChatState,
    agent_id: &str,
    agent_name: &str,
    content: String,
    round_id: &str,
    now: DateTime<Utc>,
) {
    if let Some(existing) = state.messages.iter_mut().find(|m| {
        m.sender_type == SenderType::Agent && m.target_agent_id.as_deref() == Some(agent_id) && m.round_id == round_id
    }) {
        existing.content = content;
        existing.created_at = now;
    } else {
        state
            .messages
            .push(ChatMessage::new_agent_reply(agent_id, agent_name, content, round_id, now));
    }
}

/// Step 5: marks the delivered user messages directed at `agent_id` this round as `responded`
/// (if the agent replied) or `ignored` (if it processed the round silently).
pub fn mark_user_messages(state: &mut ChatState, agent_id: &str, current_round_id: &str, responded: bool) {
    let new_status = if responded {
        MessageStatus::Responded
    } else {
        MessageStatus::Ignored
    };

    for message in state.messages.iter_mut() {
        if message.is_delivered_for_round(current_round_id) && message.target_agent_id.as_deref() == Some(agent_id) {
            message.status = Some(new_status);
        }
    }
}

/// Unique sender display names of delivered messages targeting `agent_id` this round, in
/// first-seen order — used to build the `@user1 @user2 …` mention prefix.
pub fn unique_senders_for(state: &ChatState, agent_id: &str, current_round_id: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut senders = Vec::new();
    for message in &state.messages {
        if message.is_delivered_for_round(current_round_id) && message.target_agent_id.as_deref() == Some(agent_id)
            && seen.insert(message.sender_name.clone())
        {
            senders.push(message.sender_name.clone());
        }
    }
    senders
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state() -> ChatState {
        ChatState::new(true, 5, 3, 200)
    }

    #[test]
    fn submit_message_rejects_when_chat_disabled() {
        let mut state = ChatState::new(false, 5, 3, 200);
        let result = submit_message(
            &mut state, "alice", None, None, "hi", 0, 0.0, 2.0, 300.0, SessionKind::Simulated, Utc::now(),
        );
        assert_eq!(result.unwrap_err(), ChatError::Disabled);
    }

    #[test]
    fn submit_message_enforces_per_user_quota() {
        let mut state = state();
        for _ in 0..3 {
            submit_message(
                &mut state, "alice", None, None, "hi", 0, 0.0, 2.0, 300.0, SessionKind::Simulated, Utc::now(),
            )
            .unwrap();
        }
        let result = submit_message(
            &mut state, "alice", None, None, "hi again", 0, 0.0, 2.0, 300.0, SessionKind::Simulated, Utc::now(),
        );
        assert!(matches!(result, Err(ChatError::UserQuotaExceeded { .. })));
    }

    #[test]
    fn deliver_pending_stamps_current_round() {
        let mut state = state();
        submit_message(
            &mut state, "alice", None, None, "hi", 0, 0.0, 2.0, 300.0, SessionKind::Simulated, Utc::now(),
        )
        .unwrap();
        deliver_pending(&mut state, "0-2.000");
        assert_eq!(state.messages[0].round_id, "0-2.000");
        assert_eq!(state.messages[0].status, Some(MessageStatus::Delivered));
    }

    #[test]
    fn prepare_agent_reply_prefixes_unique_senders() {
        let state = state();
        let reply = prepare_agent_reply(&state, "Buying more AAPL.", &["alice".to_string(), "bob".to_string()]);
        assert_eq!(reply.unwrap(), "@alice @bob Buying more AAPL.");
    }

    #[test]
    fn prepare_agent_reply_drops_when_stripped_content_is_empty() {
        let state = state();
        let reply = prepare_agent_reply(&state, "https://spam.example.com", &[]);
        assert!(reply.is_none());
    }

    #[test]
    fn upsert_agent_reply_replaces_existing_message_for_same_round() {
        let mut state = state();
        upsert_agent_reply(&mut state, "agent-1", "Agent One", "first".to_string(), "0-2.000", Utc::now());
        upsert_agent_reply(&mut state, "agent-1", "Agent One", "second".to_string(), "0-2.000", Utc::now());
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, "second");
    }

    #[test]
    fn mark_user_messages_sets_responded_or_ignored() {
        let mut state = state();
        submit_message(
            &mut state, "alice", Some("agent-1".to_string()), None, "hi", 0, 0.0, 2.0, 300.0,
            SessionKind::Simulated, Utc::now(),
        )
        .unwrap();
        deliver_pending(&mut state, "0-2.000");
        mark_user_messages(&mut state, "agent-1", "0-2.000", true);
        assert_eq!(state.messages[0].status, Some(MessageStatus::Responded));
    }
}
