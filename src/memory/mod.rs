//! Opaque long-term memory source: consulted only as
//! `{id, content, score, metadata}`, never as a concrete vector store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub metadata: Value,
}

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MemorySource: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryEntry>, MemoryError>;

    async fn get_all(&self) -> Result<Vec<MemoryEntry>, MemoryError>;
}

/// A memory source with no entries. Used when no long-term memory backend
/// is configured; grounding simply finds no memory-sourced citations.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyMemorySource;

#[async_trait]
impl MemorySource for EmptyMemorySource {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn get_all(&self) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }
}
