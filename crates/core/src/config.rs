use crate::error::ProviderError;
use crate::models::ChunkOptions;
use std::fmt;
use url::Url;

pub const DEFAULT_INDEX_NAME: &str = "pdf-index";
pub const DEFAULT_RETRIEVAL_K: usize = 3;
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Settings shared by the indexing and query pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub index_name: String,
    pub retrieval_k: usize,
    pub chunking: ChunkOptions,
    pub generation_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            retrieval_k: DEFAULT_RETRIEVAL_K,
            chunking: ChunkOptions::default(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generation_model = model.into();
        self
    }
}

/// Connection settings for the Google Generative Language API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub embedding_model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ProviderError::MissingCredentials(
                "Gemini API key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: Url::parse(DEFAULT_GEMINI_BASE_URL)?,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        })
    }

    /// Reads `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::MissingCredentials(
                    "set GEMINI_API_KEY or GOOGLE_API_KEY".to_string(),
                )
            })?;
        Self::new(api_key)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ProviderError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        self.base_url = Url::parse(&normalized)?;
        Ok(self)
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// `{base}/models/{model}:{method}`
    pub fn model_url(&self, model: &str, method: &str) -> Result<Url, ProviderError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        Ok(self.base_url.join(&format!("models/{model}:{method}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.index_name, "pdf-index");
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.chunking, ChunkOptions::default());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            GeminiConfig::new("  "),
            Err(ProviderError::MissingCredentials(_))
        ));
    }

    #[test]
    fn model_url_joins_base_model_and_method() {
        let config = GeminiConfig::new("key")
            .unwrap()
            .with_base_url("http://localhost:8080/v1beta")
            .unwrap();

        let url = config.model_url("models/text-embedding-004", "embedContent").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = GeminiConfig::new("secret-key").unwrap();
        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
