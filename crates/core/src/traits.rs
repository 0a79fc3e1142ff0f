use crate::{Document, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Persists documents under a named index and finds the ones nearest to a query.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and append `documents` to `index_name`. Existing entries are kept.
    async fn write(&self, index_name: &str, documents: Vec<Document>) -> Result<(), StoreError>;

    /// Up to `k` documents ordered by descending similarity to `query`.
    async fn search(
        &self,
        index_name: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, StoreError>;
}

#[async_trait]
impl<S> VectorStore for Arc<S>
where
    S: VectorStore + ?Sized,
{
    async fn write(&self, index_name: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        (**self).write(index_name, documents).await
    }

    async fn search(
        &self,
        index_name: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).search(index_name, query, k).await
    }
}
