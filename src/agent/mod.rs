//! Agent orchestrator - bounded tool-calling loop for one user turn
//!
//! START → DECIDE → (TOOL EXEC → DECIDE)* → DONE
//!
//! The model either answers directly or asks for the retrieval tool. Tool
//! results are appended to the turn's conversation and the model is asked
//! again, up to a fixed iteration ceiling.

pub mod prompt;

pub use prompt::PromptTemplate;

use crate::conversation::{Conversation, ConversationMessage};
use crate::models::{ConversationTurn, ModelReply, ToolSpec, TurnStatus};
use crate::tools::Tool;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const MAX_ITERATIONS: usize = 10;

/// Answer returned when the iteration ceiling is reached.
pub const FALLBACK_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

const TOOL_CAP_NOTE: &str =
    "Tool call limit reached for this question. Answer using the transactions already retrieved.";

/// Trait for the external chat model (LLM controlled)
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Decide the next step given the conversation so far.
    async fn respond(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Result<ModelReply>;
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_iterations: usize,
    /// Hard cap on tool executions per turn. `None` leaves it to the prompt.
    pub max_tool_calls: Option<usize>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            max_tool_calls: None,
        }
    }
}

pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    tool: Arc<dyn Tool>,
    prompt: PromptTemplate,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tool: Arc<dyn Tool>,
        prompt: PromptTemplate,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            model,
            tool,
            prompt,
            config,
        }
    }

    /// Run one user turn to completion.
    ///
    /// Model and tool failures end the turn with an error. Reaching the
    /// iteration ceiling is not an error: the turn comes back with
    /// [`TurnStatus::IterationLimitExceeded`] and [`FALLBACK_ANSWER`].
    pub async fn run_turn(&self, input: &str) -> Result<ConversationTurn> {
        let turn_id = Uuid::new_v4();
        self.run_turn_inner(turn_id, input)
            .instrument(info_span!("turn", turn_id = %turn_id))
            .await
    }

    async fn run_turn_inner(&self, turn_id: Uuid, input: &str) -> Result<ConversationTurn> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        info!(input = %input, "Orchestrator: starting turn");

        let mut conversation = Conversation::new(self.prompt.render(self.tool.name()));
        conversation.push(ConversationMessage::user(input));

        let tools = [self.tool.spec()];
        let mut invocations = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            // === DECIDE ===
            let reply = self.model.respond(&conversation, &tools).await?;

            match reply {
                ModelReply::FinalAnswer(answer) => {
                    info!(
                        iterations = iteration,
                        tool_calls = invocations.len(),
                        "Turn answered"
                    );

                    return Ok(ConversationTurn {
                        turn_id,
                        input: input.to_string(),
                        answer,
                        status: TurnStatus::Answered,
                        tool_invocations: invocations,
                        iterations: iteration,
                        started_at,
                        elapsed_ms: start_time.elapsed().as_millis() as u64,
                    });
                }
                ModelReply::ToolRequest {
                    name,
                    argument,
                    args,
                } => {
                    // === TOOL EXEC ===
                    debug!(
                        iteration,
                        tool_name = %name,
                        argument = %argument,
                        "Model requested tool"
                    );

                    // Never echo an undeclared function back to the model.
                    if name != self.tool.name() {
                        warn!(tool_name = %name, "Model requested unknown tool");
                        conversation.push(ConversationMessage::user(format!(
                            "Unknown tool `{}`. The only available tool is `{}`.",
                            name,
                            self.tool.name()
                        )));
                        continue;
                    }

                    conversation.push(ConversationMessage::tool_call(&name, args));

                    let result = if self
                        .config
                        .max_tool_calls
                        .is_some_and(|cap| invocations.len() >= cap)
                    {
                        warn!(
                            tool_calls = invocations.len(),
                            "Tool call cap reached - refusing further calls"
                        );
                        TOOL_CAP_NOTE.to_string()
                    } else {
                        let invocation = self.tool.invoke(&argument).await?;
                        let response = invocation.response.clone();
                        invocations.push(invocation);
                        response
                    };

                    conversation.push(ConversationMessage::tool_result(name, result));
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            tool_calls = invocations.len(),
            "Iteration limit reached - returning fallback answer"
        );

        Ok(ConversationTurn {
            turn_id,
            input: input.to_string(),
            answer: FALLBACK_ANSWER.to_string(),
            status: TurnStatus::IterationLimitExceeded,
            tool_invocations: invocations,
            iterations: self.config.max_iterations,
            started_at,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
