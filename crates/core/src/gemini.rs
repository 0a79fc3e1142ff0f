//! Embedding and generation backed by the Google Generative Language API.

use crate::config::GeminiConfig;
use crate::embeddings::Embedder;
use crate::error::ProviderError;
use crate::generator::{grounded_prompt, AnswerGenerator, GenerationRequest, GenerationResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

const BACKEND: &str = "gemini";

/// `batchEmbedContents` accepts at most this many requests per call.
const MAX_BATCH: usize = 100;

/// Output size of `text-embedding-004`.
pub const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn post_json<B, R>(&self, url: Url, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "request failed");
            return Err(ProviderError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{status}: {body}"),
            });
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(role: Option<&'static str>, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Text of the first candidate, with its parts concatenated.
fn candidate_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub struct GeminiEmbedder {
    client: GeminiClient,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            dimensions: GEMINI_EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn model_name(&self) -> String {
        let model = &self.client.config().embedding_model;
        if model.starts_with("models/") {
            model.clone()
        } else {
            format!("models/{model}")
        }
    }

    fn request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: self.model_name(),
            content: Content::text(None, text),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        debug!(backend = BACKEND, text_len = text.len(), "embedding single text");
        let config = self.client.config();
        let url = config.model_url(&config.embedding_model, "embedContent")?;
        let response: EmbedContentResponse = self.client.post_json(url, &self.request(text)).await?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let config = self.client.config();
        let url = config.model_url(&config.embedding_model, "batchEmbedContents")?;
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            debug!(backend = BACKEND, batch_size = batch.len(), "embedding batch");
            let body = BatchEmbedRequest {
                requests: batch.iter().map(|text| self.request(text)).collect(),
            };
            let response: BatchEmbedResponse = self.client.post_json(url.clone(), &body).await?;

            if response.embeddings.len() != batch.len() {
                return Err(ProviderError::BackendResponse {
                    backend: BACKEND.to_string(),
                    details: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        response.embeddings.len()
                    ),
                });
            }
            vectors.extend(response.embeddings.into_iter().map(|embedding| embedding.values));
        }

        Ok(vectors)
    }
}

pub struct GeminiGenerator {
    client: GeminiClient,
}

impl GeminiGenerator {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// The model is chosen per request; the client config only holds the embedding model.
    fn generate_url(&self, model: &str) -> Result<Url, ProviderError> {
        self.client.config().model_url(model, "generateContent")
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationResponse, ProviderError> {
        debug!(
            backend = BACKEND,
            model = request.model,
            context_documents = request.context.len(),
            "generating answer"
        );

        let url = self.generate_url(request.model)?;
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), grounded_prompt(&request))],
        };
        let response: GenerateContentResponse = self.client.post_json(url, &body).await?;

        candidate_text(response)
            .map(|text| GenerationResponse { text })
            .ok_or_else(|| ProviderError::EmptyResponse(format!("{BACKEND} model {}", request.model)))
    }
}
