use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged turn. Order within a conversation is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

fn validate_message(message: &str) -> Result<()> {
    if message.is_empty() {
        return Err(ChatError::validation("message must not be empty"));
    }
    Ok(())
}

/// Builds the message list sent to the runtime: the caller's history verbatim,
/// followed by the new user turn. `history` is borrowed and never modified.
pub fn assemble(history: &[Message], new_message: &str) -> Result<Vec<Message>> {
    validate_message(new_message)?;

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend_from_slice(history);
    messages.push(Message::user(new_message));
    Ok(messages)
}
