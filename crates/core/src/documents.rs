use crate::models::{Document, DocumentMetadata};

/// Wrap each chunk in a [`Document`] carrying the same source metadata.
pub fn to_documents<I>(chunks: I, metadata: &DocumentMetadata) -> Vec<Document>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    chunks
        .into_iter()
        .map(|chunk| Document::from_text(chunk, metadata.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_preserve_order_count_and_metadata() {
        let metadata = DocumentMetadata::new("/tmp/report.pdf");
        let chunks = vec!["first".to_string(), "second".to_string(), "third".to_string()];

        let documents = to_documents(chunks.clone(), &metadata);

        assert_eq!(documents.len(), chunks.len());
        for (document, chunk) in documents.iter().zip(&chunks) {
            assert_eq!(&document.content, chunk);
            assert_eq!(document.metadata, metadata);
        }
    }

    #[test]
    fn zero_chunks_give_zero_documents() {
        let documents = to_documents(Vec::<String>::new(), &DocumentMetadata::new("a.pdf"));
        assert!(documents.is_empty());
    }

    #[test]
    fn metadata_serializes_with_camel_case_file_path() -> Result<(), serde_json::Error> {
        let documents = to_documents(["text"], &DocumentMetadata::new("/docs/a.pdf"));
        let value = serde_json::to_value(&documents[0])?;
        assert_eq!(value["metadata"]["filePath"], "/docs/a.pdf");
        Ok(())
    }
}
