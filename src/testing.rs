//! Test doubles for the chat model and similarity search

use crate::agent::ChatModel;
use crate::conversation::Conversation;
use crate::index::SimilaritySearch;
use crate::models::{ModelReply, ScoredChunk, ToolSpec, TransactionChunk};
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Script = fn(usize, &Conversation) -> Result<ModelReply>;

/// Chat model whose replies come from a function of (call number, conversation).
pub struct ScriptedModel {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn respond(&self, conversation: &Conversation, _tools: &[ToolSpec]) -> Result<ModelReply> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(call, conversation)
    }
}

/// Search that returns fixed rows in order and counts how often it runs.
pub struct CountingIndex {
    rows: Vec<String>,
    searches: AtomicUsize,
}

impl CountingIndex {
    pub fn new(rows: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            rows: rows.iter().map(|r| r.to_string()).collect(),
            searches: AtomicUsize::new(0),
        })
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilaritySearch for CountingIndex {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .iter()
            .take(k)
            .enumerate()
            .map(|(position, row)| ScoredChunk {
                chunk: TransactionChunk {
                    position,
                    text: row.clone(),
                    start: 0,
                    end: row.len(),
                },
                score: 1.0 / (position as f32 + 1.0),
            })
            .collect())
    }
}
