pub mod chunking;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod traits;

pub use chunking::{chunk, chunk_spans, normalize_whitespace, validate_options};
pub use config::{GeminiConfig, PipelineConfig};
pub use documents::to_documents;
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, ProviderError, QueryError, StoreError};
pub use extractor::{LopdfExtractor, PageText, TextExtractor};
pub use gemini::{GeminiClient, GeminiEmbedder, GeminiGenerator};
pub use generator::{
    build_prompt, AnswerGenerator, GenerationRequest, GenerationResponse,
};
pub use models::{ChunkOptions, ChunkSpan, Document, DocumentMetadata, IndexEntry, SplitPolicy};
pub use pipeline::{IndexingPipeline, QueryPipeline};
pub use stores::{LocalVectorStore, QdrantStore};
pub use traits::VectorStore;
