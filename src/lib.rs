//! Transactions Agent
//!
//! A command-line chat agent that answers questions about a personal
//! transactions file:
//! - Loads the file once and splits it into overlapping chunks
//! - Embeds the chunks into an in-memory similarity index
//! - Exposes similarity search to the model as a single retrieval tool
//! - Runs a bounded tool-calling loop per question
//!
//! TURN LOOP:
//! INPUT → MODEL → (RETRIEVE → MODEL)* → ANSWER

pub mod agent;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod gemini;
pub mod index;
pub mod models;
pub mod shell;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use agent::{Orchestrator, OrchestratorConfig};
