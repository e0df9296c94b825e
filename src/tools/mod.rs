//! Tool trait and the transaction retrieval tool
//!
//! Tools take a single free-text argument and return text that is fed back
//! to the model as the tool result.

use crate::index::SimilaritySearch;
use crate::models::{ToolInvocation, ToolSpec};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Trait for a single tool callable by the model
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            argument: "query".to_string(),
            argument_description: "Free-text description of the transactions to look up".to_string(),
        }
    }

    async fn invoke(&self, query: &str) -> Result<ToolInvocation>;
}

pub const RETRIEVAL_TOOL_NAME: &str = "search_transactions";
pub const DEFAULT_TOP_K: usize = 5;
pub const CHUNK_DELIMITER: &str = "\n\n";

const NO_MATCHES: &str = "No matching transactions were found.";

/// Similarity search over the indexed transactions file
pub struct RetrievalTool {
    index: Arc<dyn SimilaritySearch>,
    top_k: usize,
}

impl RetrievalTool {
    pub fn new(index: Arc<dyn SimilaritySearch>) -> Self {
        Self::with_top_k(index, DEFAULT_TOP_K)
    }

    pub fn with_top_k(index: Arc<dyn SimilaritySearch>, top_k: usize) -> Self {
        Self { index, top_k }
    }
}

#[async_trait::async_trait]
impl Tool for RetrievalTool {
    fn name(&self) -> &'static str {
        RETRIEVAL_TOOL_NAME
    }

    fn description(&self) -> &'static str {
        "Search the user's transaction history and return the most relevant rows"
    }

    async fn invoke(&self, query: &str) -> Result<ToolInvocation> {
        let start = Instant::now();
        let hits = self.index.search(query, self.top_k).await?;

        let response = if hits.is_empty() {
            NO_MATCHES.to_string()
        } else {
            hits.iter()
                .map(|hit| hit.chunk.text.as_str())
                .collect::<Vec<_>>()
                .join(CHUNK_DELIMITER)
        };

        debug!(
            query = %query,
            hits = hits.len(),
            response_bytes = response.len(),
            "Retrieval tool invoked"
        );

        Ok(ToolInvocation {
            tool_name: RETRIEVAL_TOOL_NAME.to_string(),
            query: query.to_string(),
            response,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
