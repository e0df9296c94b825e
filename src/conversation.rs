//! Per-turn conversation context
//!
//! Holds the system prompt and the messages exchanged with the model during
//! a single user turn. Nothing here survives past the turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    Tool,
}

/// Payload of a single message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolCall { name: String, args: Value },
    ToolResult { name: String, content: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, MessageContent::Text { text: text.into() })
    }

    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self::new(
            MessageRole::Agent,
            MessageContent::ToolCall {
                name: name.into(),
                args,
            },
        )
    }

    pub fn tool_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Tool,
            MessageContent::ToolResult {
                name: name.into(),
                content: content.into(),
            },
        )
    }

    fn new(role: MessageRole, content: MessageContent) -> Self {
        Self {
            timestamp: Utc::now(),
            role,
            content,
        }
    }
}

/// Conversation sent to the chat model on every iteration of a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    system_prompt: String,
    messages: VecDeque<ConversationMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: VecDeque::new(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push_back(message);
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Content of the most recent tool result, if any.
    pub fn last_tool_result(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match &m.content {
            MessageContent::ToolResult { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Number of tool calls the model has made so far.
    pub fn tool_call_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m.content, MessageContent::ToolCall { .. }))
            .count()
    }
}
