use crate::embeddings::Embedder;
use crate::models::{Document, IndexEntry};
use crate::traits::VectorStore;
use crate::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Vector store kept in process memory, optionally mirrored to one JSON file per
/// index (`__db_<index>.json`) under a directory.
///
/// Writes append; nothing is de-duplicated. Concurrent writers inside one process
/// are serialized by the lock, writers in other processes are not.
pub struct LocalVectorStore<E> {
    embedder: E,
    directory: Option<PathBuf>,
    indexes: RwLock<HashMap<String, Vec<IndexEntry>>>,
}

impl<E: Embedder> LocalVectorStore<E> {
    pub fn in_memory(embedder: E) -> Self {
        Self {
            embedder,
            directory: None,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn persistent(directory: impl Into<PathBuf>, embedder: E) -> Self {
        Self {
            embedder,
            directory: Some(directory.into()),
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn index_path(&self, index_name: &str) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|directory| directory.join(format!("__db_{}.json", file_stem(index_name))))
    }

    /// Number of entries stored under `index_name`.
    pub async fn len(&self, index_name: &str) -> Result<usize, StoreError> {
        self.ensure_loaded(index_name).await?;
        let indexes = self.indexes.read().await;
        Ok(indexes.get(index_name).map_or(0, Vec::len))
    }

    async fn ensure_loaded(&self, index_name: &str) -> Result<(), StoreError> {
        if self.indexes.read().await.contains_key(index_name) {
            return Ok(());
        }

        let entries = match self.index_path(index_name) {
            Some(path) => read_entries(&path).await?,
            None => Vec::new(),
        };

        self.indexes
            .write()
            .await
            .entry(index_name.to_string())
            .or_insert(entries);
        Ok(())
    }

    async fn persist(&self, index_name: &str, entries: &[IndexEntry]) -> Result<(), StoreError> {
        let Some(path) = self.index_path(index_name) else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, serde_json::to_vec(entries)?).await?;
        tokio::fs::rename(&staging, &path).await?;
        debug!(path = %path.display(), entries = entries.len(), "index persisted");
        Ok(())
    }
}

#[async_trait]
impl<E: Embedder> VectorStore for LocalVectorStore<E> {
    async fn write(&self, index_name: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        if documents.is_empty() {
            debug!(index = index_name, "empty batch, nothing to write");
            return Ok(());
        }

        let texts = documents
            .iter()
            .map(|document| document.content.as_str())
            .collect::<Vec<_>>();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != documents.len() {
            return Err(StoreError::BackendResponse {
                backend: "local".to_string(),
                details: format!(
                    "embedding count {} doesn't match document count {}",
                    vectors.len(),
                    documents.len()
                ),
            });
        }

        self.ensure_loaded(index_name).await?;
        let mut indexes = self.indexes.write().await;
        let entries = indexes.entry(index_name.to_string()).or_default();

        let expected = entries
            .first()
            .map_or_else(|| self.embedder.dimensions(), |entry| entry.vector.len());
        if let Some(vector) = vectors.iter().find(|vector| vector.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let added = documents.len();
        let mut next = entries.clone();
        next.extend(
            vectors
                .into_iter()
                .zip(documents)
                .map(|(vector, document)| IndexEntry::new(vector, document)),
        );

        // Entries become visible only once the file holds them.
        self.persist(index_name, &next).await?;
        *entries = next;
        info!(index = index_name, added, total = entries.len(), "documents indexed");
        Ok(())
    }

    async fn search(
        &self,
        index_name: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        self.ensure_loaded(index_name).await?;

        let indexes = self.indexes.read().await;
        let Some(entries) = indexes.get(index_name).filter(|entries| !entries.is_empty()) else {
            debug!(index = index_name, "search on empty index");
            return Ok(Vec::new());
        };

        if let Some(entry) = entries
            .iter()
            .find(|entry| entry.vector.len() != query_vector.len())
        {
            return Err(StoreError::DimensionMismatch {
                expected: entry.vector.len(),
                actual: query_vector.len(),
            });
        }

        let mut scored = entries
            .iter()
            .map(|entry| (cosine_similarity(&entry.vector, &query_vector), entry))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, entry)| entry.document.clone())
            .collect())
    }
}

async fn read_entries(path: &Path) -> Result<Vec<IndexEntry>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(error) => Err(error.into()),
    }
}

fn file_stem(index_name: &str) -> String {
    index_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Returns 0.0 when either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::models::DocumentMetadata;
    use tempfile::tempdir;

    fn documents(texts: &[&str]) -> Vec<Document> {
        texts
            .iter()
            .map(|text| Document::from_text(*text, DocumentMetadata::new("/docs/a.pdf")))
            .collect()
    }

    #[tokio::test]
    async fn search_ranks_most_similar_first() -> Result<(), StoreError> {
        let store = LocalVectorStore::in_memory(CharacterNgramEmbedder::default());
        store
            .write(
                "pdf-index",
                documents(&[
                    "Hydraulic pumps need regular seal maintenance.",
                    "The capital of France is Paris.",
                    "Turbine blades are inspected for corrosion.",
                ]),
            )
            .await?;

        let hits = store.search("pdf-index", "capital of France", 2).await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "The capital of France is Paris.");
        Ok(())
    }

    #[tokio::test]
    async fn search_returns_at_most_k_and_all_when_fewer() -> Result<(), StoreError> {
        let store = LocalVectorStore::in_memory(CharacterNgramEmbedder::default());
        store.write("idx", documents(&["one", "two"])).await?;

        assert_eq!(store.search("idx", "query", 3).await?.len(), 2);
        assert_eq!(store.search("idx", "query", 1).await?.len(), 1);
        assert!(store.search("idx", "query", 0).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_index_searches_as_empty() -> Result<(), StoreError> {
        let store = LocalVectorStore::in_memory(CharacterNgramEmbedder::default());
        assert!(store.search("missing", "anything", 3).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn writes_append_duplicates() -> Result<(), StoreError> {
        let store = LocalVectorStore::in_memory(CharacterNgramEmbedder::default());
        store.write("idx", documents(&["same text"])).await?;
        store.write("idx", documents(&["same text"])).await?;
        assert_eq!(store.len("idx").await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn empty_batch_is_accepted() -> Result<(), StoreError> {
        let store = LocalVectorStore::in_memory(CharacterNgramEmbedder::default());
        store.write("idx", Vec::new()).await?;
        assert_eq!(store.len("idx").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn persistent_store_reloads_entries() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::persistent(dir.path(), CharacterNgramEmbedder::default());
        store
            .write("pdf-index", documents(&["The capital of France is Paris."]))
            .await?;

        let path = store.index_path("pdf-index").ok_or("no index path")?;
        assert!(path.ends_with("__db_pdf-index.json"));
        assert!(path.exists());

        let reopened = LocalVectorStore::persistent(dir.path(), CharacterNgramEmbedder::default());
        let hits = reopened.search("pdf-index", "France", 3).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.file_path, "/docs/a.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn failed_persist_leaves_index_unchanged() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::persistent(dir.path(), CharacterNgramEmbedder::default());
        store.write("idx", documents(&["kept entry"])).await?;

        std::fs::create_dir(dir.path().join("__db_idx.json.tmp"))?;
        let result = store.write("idx", documents(&["lost entry"])).await;

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(store.len("idx").await?, 1);
        let hits = store.search("idx", "lost entry", 3).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "kept entry");
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_embedder_dimensions_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalVectorStore::persistent(dir.path(), CharacterNgramEmbedder { dimensions: 16 });
        store.write("idx", documents(&["text"])).await?;

        let other = LocalVectorStore::persistent(dir.path(), CharacterNgramEmbedder { dimensions: 32 });
        let result = other.search("idx", "text", 3).await;
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 16,
                actual: 32
            })
        ));
        Ok(())
    }

    #[test]
    fn index_names_are_made_file_safe() {
        assert_eq!(file_stem("../evil/name"), "___evil_name");
        assert_eq!(file_stem("pdf-index"), "pdf-index");
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
    }
}
