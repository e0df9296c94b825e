use dotenv::dotenv;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use transactions_agent::{
    agent::{Orchestrator, OrchestratorConfig, PromptTemplate},
    config::AgentConfig,
    document::{load_document, ChunkSplitter},
    gemini::GeminiClient,
    index::EmbeddingIndex,
    shell::{Shell, EXIT_KEYWORD},
    tools::RetrievalTool,
    Result,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "Transactions agent stopped");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = AgentConfig::from_env()?;

    info!(
        path = %config.transactions_path.display(),
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "Transactions agent starting"
    );

    // Build everything up front: no network calls happen between turns
    // except those a turn makes itself.
    let text = load_document(&config.transactions_path).await?;
    let splitter = ChunkSplitter::new(config.chunk_size, config.chunk_overlap)?;
    let chunks = splitter.split(&text);

    let gemini = Arc::new(GeminiClient::new(&config)?);
    let index = Arc::new(EmbeddingIndex::build(chunks, gemini.clone()).await?);
    let chunk_count = index.len();

    let tool = Arc::new(RetrievalTool::with_top_k(index, config.top_k));
    let orchestrator = Orchestrator::new(
        gemini,
        tool,
        PromptTemplate::default(),
        OrchestratorConfig {
            max_iterations: config.max_iterations,
            ..OrchestratorConfig::default()
        },
    );

    let banner = format!(
        "Loaded {} ({} chunks indexed). Ask about your transactions, or type '{}' to quit.",
        config.transactions_path.display(),
        chunk_count,
        EXIT_KEYWORD
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let transcript = Shell::new(&orchestrator)
        .with_banner(banner)
        .run(stdin, &mut stdout)
        .await?;

    info!(turns = transcript.len(), "Session ended");

    Ok(())
}
