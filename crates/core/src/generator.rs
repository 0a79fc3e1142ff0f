use crate::error::ProviderError;
use crate::models::Document;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub context: &'a [Document],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
}

/// Produces an answer from a prompt and the documents it should be grounded on.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationResponse, ProviderError>;
}

#[async_trait]
impl<G> AnswerGenerator for Arc<G>
where
    G: AnswerGenerator + ?Sized,
{
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationResponse, ProviderError> {
        (**self).generate(request).await
    }
}

pub const NO_CONTEXT_MARKER: &str = "(no documents were retrieved)";

/// Instructions sent with every question: answer from the context only, and say
/// so when the context does not contain the answer.
pub fn build_prompt(query: &str) -> String {
    format!(
        "You are an AI assistant that answers questions using a specific context.\n\n\
         Use only the context from the provided documents to answer the question.\n\
         If the answer is not in the context, say clearly that you do not have that information. \
         Do not make up an answer.\n\n\
         Question: {query}"
    )
}

/// Numbered context block listing each document with its source file.
pub fn render_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return format!("Context:\n{NO_CONTEXT_MARKER}");
    }

    let entries = documents
        .iter()
        .enumerate()
        .map(|(index, document)| {
            format!(
                "[{}] (source: {})\n{}",
                index + 1,
                document.metadata.file_path,
                document.content.trim()
            )
        })
        .collect::<Vec<_>>();

    format!("Context:\n{}", entries.join("\n\n"))
}

/// Prompt followed by the rendered context, as sent to text-only models.
pub fn grounded_prompt(request: &GenerationRequest<'_>) -> String {
    format!("{}\n\n{}", request.prompt, render_context(request.context))
}
