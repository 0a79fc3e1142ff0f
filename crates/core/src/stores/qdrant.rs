use crate::embeddings::Embedder;
use crate::traits::VectorStore;
use crate::{Document, StoreError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const BACKEND: &str = "qdrant";

/// Vector store backed by a Qdrant server over its REST API. Each index name maps
/// to one collection, created on first write with cosine distance.
pub struct QdrantStore<E> {
    endpoint: Url,
    client: Client,
    embedder: E,
}

impl<E: Embedder> QdrantStore<E> {
    pub fn new(endpoint: &str, embedder: E) -> Result<Self, StoreError> {
        let normalized = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };

        Ok(Self {
            endpoint: Url::parse(&normalized)?,
            client: Client::new(),
            embedder,
        })
    }

    /// `{endpoint}/collections/{collection}/{suffix..}` with the collection name
    /// percent-encoded as a single path segment.
    fn collection_url(&self, collection: &str, suffix: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| backend_error(format!("{} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .push("collections")
            .push(collection)
            .extend(suffix);
        Ok(url)
    }

    pub async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        let url = self.collection_url(collection, &[])?;
        let response = self.client.get(url.clone()).send().await?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response.status().to_string()));
        }

        let response = self
            .client
            .put(url)
            .json(&json!({
                "vectors": {
                    "size": self.embedder.dimensions(),
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(format!(
                "collection setup failed with {}",
                response.status()
            )));
        }

        info!(collection, dimensions = self.embedder.dimensions(), "qdrant collection created");
        Ok(())
    }
}

#[async_trait]
impl<E: Embedder> VectorStore for QdrantStore<E> {
    async fn write(&self, index_name: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts = documents
            .iter()
            .map(|document| document.content.as_str())
            .collect::<Vec<_>>();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let points = build_points(&documents, &embeddings, self.embedder.dimensions())?;

        self.ensure_collection(index_name).await?;

        let mut url = self.collection_url(index_name, &["points"])?;
        url.set_query(Some("wait=true"));

        let response = self
            .client
            .put(url)
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        info!(collection = index_name, added = points.len(), "documents indexed");
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
        if query_vector.len() != self.embedder.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: self.embedder.dimensions(),
                actual: query_vector.len(),
            });
        }

        let response = self
            .client
            .post(self.collection_url(index_name, &["points", "search"])?)
            .json(&json!({
                "vector": query_vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection = index_name, "search on missing collection");
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        parse_hits(&parsed)
    }
}

fn backend_error(details: String) -> StoreError {
    StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        details,
    }
}

fn build_points(
    documents: &[Document],
    embeddings: &[Vec<f32>],
    vector_size: usize,
) -> Result<Vec<Value>, StoreError> {
    if documents.len() != embeddings.len() {
        return Err(backend_error(format!(
            "embedding count {} doesn't match document count {}",
            embeddings.len(),
            documents.len()
        )));
    }

    documents
        .iter()
        .zip(embeddings)
        .map(|(document, embedding)| {
            if embedding.len() != vector_size {
                return Err(StoreError::DimensionMismatch {
                    expected: vector_size,
                    actual: embedding.len(),
                });
            }

            Ok(json!({
                "id": Uuid::new_v4().to_string(),
                "vector": embedding,
                "payload": serde_json::to_value(document)?,
            }))
        })
        .collect()
}

/// Documents from a `points/search` response, keeping the server's ranking.
fn parse_hits(response: &Value) -> Result<Vec<Document>, StoreError> {
    let hits = response
        .pointer("/result")
        .and_then(Value::as_array)
        .ok_or_else(|| backend_error("search response has no result array".to_string()))?;

    hits.iter()
        .map(|hit| {
            let payload = hit
                .get("payload")
                .cloned()
                .ok_or_else(|| backend_error("search hit without payload".to_string()))?;
            Ok(serde_json::from_value(payload)?)
        })
        .collect()
}
