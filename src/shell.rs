//! Interactive read-eval-print loop
//!
//! Strictly sequential: each turn finishes, network calls included, before
//! the next prompt is shown. Turn errors are printed and the loop goes on;
//! only the exit keyword or end of input ends it.

use crate::agent::Orchestrator;
use crate::models::ConversationTurn;
use crate::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

pub const EXIT_KEYWORD: &str = "exit";

const PROMPT: &str = "You: ";

/// True when the line asks to leave the shell (any letter case).
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(EXIT_KEYWORD)
}

pub struct Shell<'a> {
    orchestrator: &'a Orchestrator,
    banner: Option<String>,
}

impl<'a> Shell<'a> {
    pub fn new(orchestrator: &'a Orchestrator) -> Self {
        Self {
            orchestrator,
            banner: None,
        }
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    /// Run until the exit keyword or end of input; returns the turns taken.
    pub async fn run<R, W>(&self, mut input: R, output: &mut W) -> Result<Vec<ConversationTurn>>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut transcript = Vec::new();

        if let Some(banner) = &self.banner {
            output.write_all(format!("{}\n\n", banner).as_bytes()).await?;
        }

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                output.write_all(b"\n").await?;
                info!("End of input - leaving shell");
                break;
            }

            // Invalid UTF-8 is replaced rather than ending the session.
            let line = String::from_utf8_lossy(&buf);

            if is_exit_command(&line) {
                info!("Exit requested");
                break;
            }

            let query = line.trim();

            match self.orchestrator.run_turn(query).await {
                Ok(turn) => {
                    if turn.is_degraded() {
                        warn!(
                            turn_id = %turn.turn_id,
                            status = %turn.status,
                            "Turn ended without a model answer"
                        );
                    }
                    output
                        .write_all(format!("Agent: {}\n\n", turn.answer).as_bytes())
                        .await?;
                    transcript.push(turn);
                }
                Err(e) => {
                    warn!(error = %e, "Turn failed");
                    output
                        .write_all(format!("Error: {}\n\n", e).as_bytes())
                        .await?;
                }
            }
        }

        output.flush().await?;
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{OrchestratorConfig, PromptTemplate, FALLBACK_ANSWER};
    use crate::error::AgentError;
    use crate::models::ModelReply;
    use crate::testing::{CountingIndex, ScriptedModel};
    use crate::tools::{RetrievalTool, RETRIEVAL_TOOL_NAME};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    fn orchestrator(model: Arc<ScriptedModel>, index: Arc<CountingIndex>) -> Orchestrator {
        Orchestrator::new(
            model,
            Arc::new(RetrievalTool::new(index)),
            PromptTemplate::default(),
            OrchestratorConfig::default(),
        )
    }

    fn echo_model() -> Arc<ScriptedModel> {
        ScriptedModel::new(|_, conversation| {
            let question = conversation
                .messages()
                .find_map(|m| match &m.content {
                    crate::conversation::MessageContent::Text { text } => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            Ok(ModelReply::FinalAnswer(format!("echo: {}", question)))
        })
    }

    async fn run_script(orchestrator: &Orchestrator, script: &[u8]) -> (Vec<ConversationTurn>, String) {
        let input = BufReader::new(Builder::new().read(script).build());
        let mut output = Vec::new();
        let transcript = Shell::new(orchestrator)
            .run(input, &mut output)
            .await
            .unwrap();
        (transcript, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_exit_keyword_any_case() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("  ExIt \r"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command(""));
    }

    #[tokio::test]
    async fn test_exit_first_makes_no_calls() {
        let model = echo_model();
        let index = CountingIndex::new(&["2024-01-05,Groceries,54.20"]);
        let orchestrator = orchestrator(model.clone(), index.clone());

        let (transcript, output) = run_script(&orchestrator, b"EXIT\n").await;

        assert!(transcript.is_empty());
        assert_eq!(output, "You: ");
        assert_eq!(model.calls(), 0);
        assert_eq!(index.searches(), 0);
    }

    #[tokio::test]
    async fn test_end_of_input_exits_cleanly() {
        let model = echo_model();
        let orchestrator = orchestrator(model.clone(), CountingIndex::new(&[]));

        let (transcript, _) = run_script(&orchestrator, b"").await;

        assert!(transcript.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_turns_until_exit() {
        let orchestrator = orchestrator(echo_model(), CountingIndex::new(&[]));

        let input = BufReader::new(
            Builder::new()
                .read(b"  what did I spend?  \n")
                .wait(Duration::from_millis(5))
                .read(b"\n")
                .read(b"exit\n")
                .build(),
        );
        let mut output = Vec::new();
        let transcript = Shell::new(&orchestrator)
            .with_banner("Indexed 1 chunk.")
            .run(input, &mut output)
            .await
            .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].input, "what did I spend?");
        // Empty input still goes to the model.
        assert_eq!(transcript[1].input, "");
        assert!(output.starts_with("Indexed 1 chunk.\n\n"));
        assert!(output.contains("Agent: echo: what did I spend?\n"));
        assert_eq!(output.matches(PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn test_turn_error_does_not_stop_shell() {
        let model = ScriptedModel::new(|call, _| {
            if call == 0 {
                Err(AgentError::ModelServiceError("timeout".to_string()))
            } else {
                Ok(ModelReply::FinalAnswer("second try".to_string()))
            }
        });
        let orchestrator = orchestrator(model, CountingIndex::new(&[]));

        let (transcript, output) = run_script(&orchestrator, b"first\nsecond\nexit\n").await;

        assert!(output.contains("Error: Model service error: timeout"));
        assert!(output.contains("Agent: second try"));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_shell() {
        let model = echo_model();
        let orchestrator = orchestrator(model.clone(), CountingIndex::new(&[]));

        let (transcript, output) = run_script(&orchestrator, b"caf\xe9?\nhello\nexit\n").await;

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].input, "caf\u{FFFD}?");
        assert_eq!(transcript[1].input, "hello");
        assert!(output.contains("Agent: echo: hello\n"));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let orchestrator = orchestrator(echo_model(), CountingIndex::new(&[]));

        let (transcript, _) = run_script(&orchestrator, b"rent").await;

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].input, "rent");
    }

    #[tokio::test]
    async fn test_degraded_turn_prints_fallback() {
        let model = ScriptedModel::new(|_, _| {
            Ok(ModelReply::ToolRequest {
                name: RETRIEVAL_TOOL_NAME.to_string(),
                argument: "again".to_string(),
                args: serde_json::json!({ "query": "again" }),
            })
        });
        let index = CountingIndex::new(&["2024-01-05,Groceries,54.20"]);
        let orchestrator = orchestrator(model, index);

        let (transcript, output) = run_script(&orchestrator, b"loop\nexit\n").await;

        assert!(output.contains(&format!("Agent: {}", FALLBACK_ANSWER)));
        assert!(transcript[0].is_degraded());
    }
}
