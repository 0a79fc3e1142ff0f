use crate::chunking::chunk;
use crate::config::PipelineConfig;
use crate::documents::to_documents;
use crate::extractor::TextExtractor;
use crate::generator::{build_prompt, AnswerGenerator, GenerationRequest};
use crate::models::{Document, DocumentMetadata};
use crate::traits::VectorStore;
use crate::{IngestError, QueryError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// PDF file → text → chunks → documents → vector store.
pub struct IndexingPipeline<X, S>
where
    X: TextExtractor,
    S: VectorStore,
{
    extractor: X,
    store: S,
    config: PipelineConfig,
}

impl<X, S> IndexingPipeline<X, S>
where
    X: TextExtractor,
    S: VectorStore,
{
    pub fn new(extractor: X, store: S, config: PipelineConfig) -> Self {
        Self {
            extractor,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Appends every chunk of the file to the configured index. Nothing is written
    /// when reading, extraction or chunking fails.
    pub async fn index_document(&self, file_path: impl AsRef<Path>) -> Result<(), IngestError> {
        let path = resolve_path(file_path.as_ref()).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| IngestError::FileNotFound {
                path: path.clone(),
                source,
            })?;

        let text = self.extractor.extract_text(&bytes).map_err(|error| {
            warn!(path = %path.display(), %error, "extraction failed");
            error
        })?;

        let chunks = chunk(&text, &self.config.chunking)?;
        let metadata = DocumentMetadata::new(path.to_string_lossy());
        let documents = to_documents(chunks, &metadata);

        info!(
            path = %path.display(),
            text_chars = text.chars().count(),
            documents = documents.len(),
            index = %self.config.index_name,
            "indexing document"
        );

        self.store.write(&self.config.index_name, documents).await?;
        Ok(())
    }
}

async fn resolve_path(path: &Path) -> Result<PathBuf, IngestError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|source| IngestError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })
}

/// Question → top-k documents → grounded answer.
pub struct QueryPipeline<S, G = ()> {
    store: S,
    generator: G,
    config: PipelineConfig,
}

impl<S: VectorStore> QueryPipeline<S> {
    /// A pipeline that can only retrieve; `answer_question` needs a generator.
    pub fn retrieval_only(store: S, config: PipelineConfig) -> Self {
        Self::new(store, (), config)
    }
}

impl<S, G> QueryPipeline<S, G>
where
    S: VectorStore,
{
    pub fn new(store: S, generator: G, config: PipelineConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The `retrieval_k` documents nearest to `query`. An empty index gives an
    /// empty result.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InvalidQuery("query is empty".to_string()));
        }

        let documents = self
            .store
            .search(&self.config.index_name, query, self.config.retrieval_k)
            .await
            .map_err(QueryError::Retrieval)?;

        info!(
            index = %self.config.index_name,
            k = self.config.retrieval_k,
            retrieved = documents.len(),
            "documents retrieved"
        );
        Ok(documents)
    }
}

impl<S, G> QueryPipeline<S, G>
where
    S: VectorStore,
    G: AnswerGenerator,
{
    pub async fn answer_question(&self, query: &str) -> Result<String, QueryError> {
        let documents = self.retrieve(query).await?;

        let request = GenerationRequest {
            model: &self.config.generation_model,
            prompt: build_prompt(query),
            context: &documents,
        };

        let response = self
            .generator
            .generate(request)
            .await
            .map_err(QueryError::Generation)?;

        info!(
            model = %self.config.generation_model,
            answer_chars = response.text.chars().count(),
            "answer generated"
        );
        Ok(response.text)
    }
}
