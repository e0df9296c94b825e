//! Core data models for the transactions agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Range;
use uuid::Uuid;

//
// ================= Chunks =================
//

/// A bounded slice of the transactions file, immutable once split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChunk {
    /// Order of appearance in the source text, starting at 0.
    pub position: usize,
    pub text: String,
    /// Byte offset of the first character in the source text.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl TransactionChunk {
    pub fn byte_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Fixed-length embedding produced once per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(pub Vec<f32>);

impl EmbeddingVector {
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// A chunk returned from similarity search together with its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: TransactionChunk,
    pub score: f32,
}

//
// ================= Tool I/O =================
//

/// Declaration of a callable tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Name of the single string argument the tool takes.
    pub argument: String,
    pub argument_description: String,
}

/// One request/response pair of a tool call within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub query: String,
    pub response: String,
    pub execution_time_ms: u64,
}

//
// ================= Model replies =================
//

/// What the chat model wants to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelReply {
    FinalAnswer(String),
    ToolRequest {
        name: String,
        /// The query text handed to the tool.
        argument: String,
        /// Call arguments exactly as the model sent them.
        args: Value,
    },
}

//
// ================= Turns =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Answered,
    /// The orchestrator hit its iteration ceiling; the answer is a fallback.
    IterationLimitExceeded,
}

/// User input and the final agent output of one loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    pub input: String,
    pub answer: String,
    pub status: TurnStatus,
    pub tool_invocations: Vec<ToolInvocation>,
    /// Number of model calls made during the turn.
    pub iterations: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ConversationTurn {
    pub fn is_degraded(&self) -> bool {
        self.status != TurnStatus::Answered
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnStatus::Answered => "answered",
            TurnStatus::IterationLimitExceeded => "iteration limit exceeded",
        };
        write!(f, "{}", s)
    }
}
