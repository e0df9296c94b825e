//! In-memory embedding index over transaction chunks
//!
//! Chunks are embedded once at startup and held read-only for the rest of
//! the process. Queries embed the query text through the same provider and
//! rank chunks by cosine similarity.

use crate::error::AgentError;
use crate::models::{EmbeddingVector, ScoredChunk, TransactionChunk};
use crate::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Texts sent per embedding request.
pub const EMBEDDING_BATCH_SIZE: usize = 100;

/// Trait for the external embedding service
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed every text, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;
}

/// Trait for top-k similarity search over the indexed chunks
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return at most `k` chunks, most similar first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}

struct IndexEntry {
    chunk: TransactionChunk,
    embedding: EmbeddingVector,
}

pub struct EmbeddingIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingIndex {
    /// Embed all chunks and build the index.
    pub async fn build(
        chunks: Vec<TransactionChunk>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimensions = 0;

        for (batch_no, batch) in chunks.chunks(EMBEDDING_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(AgentError::EmbeddingServiceError(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                if dimensions == 0 {
                    dimensions = embedding.dimensions();
                }
                if embedding.dimensions() == 0 || embedding.dimensions() != dimensions {
                    return Err(AgentError::EmbeddingServiceError(format!(
                        "embedding for chunk {} has {} dimensions, expected {}",
                        chunk.position,
                        embedding.dimensions(),
                        dimensions
                    )));
                }
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }

            debug!(batch = batch_no, size = batch.len(), "Embedded chunk batch");
        }

        info!(chunks = entries.len(), dimensions, "Embedding index built");

        Ok(Self {
            entries,
            dimensions,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Rank chunks against `text`, most similar first, at most `k` of them.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AgentError::EmbeddingServiceError("no embedding returned for query".to_string())
            })?;

        if query_vector.dimensions() != self.dimensions {
            return Err(AgentError::EmbeddingServiceError(format!(
                "query embedding has {} dimensions, index has {}",
                query_vector.dimensions(),
                self.dimensions
            )));
        }

        let mut hits: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_vector.as_slice(), entry.embedding.as_slice()),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.position.cmp(&b.chunk.position))
        });
        hits.truncate(k);

        debug!(
            k,
            returned = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "Similarity search complete"
        );

        Ok(hits)
    }
}

#[async_trait]
impl SimilaritySearch for EmbeddingIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.query(query, k).await
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return 0.0;
    }
    (dot / denom) as f32
}
