use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a PDF into indexed documents.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found or unreadable: {path}")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("invalid chunking parameters: {0}")]
    InvalidParameters(String),

    #[error("vector store write failed: {0}")]
    Store(#[from] StoreError),
}

/// Failures while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[source] StoreError),

    #[error("answer generation failed: {0}")]
    Generation(#[source] ProviderError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reported by hosted embedding and generation services.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
