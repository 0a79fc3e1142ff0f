use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_path: String,
}

impl DocumentMetadata {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

/// A chunk of source text plus the metadata of the file it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn from_text(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A chunk with its position in the source text, in characters. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Stored form of a document inside the local vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub document: Document,
    pub indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn new(vector: Vec<f32>, document: Document) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            document,
            indexed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Prefer ending chunks on sentence or paragraph boundaries.
    #[default]
    Sentence,
    /// Cut on raw character counts.
    Character,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkOptions {
    pub min_length: usize,
    pub max_length: usize,
    pub overlap: usize,
    pub split_policy: SplitPolicy,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            min_length: 1_000,
            max_length: 2_000,
            overlap: 100,
            split_policy: SplitPolicy::Sentence,
        }
    }
}
