use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_qa_core::config::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_GEMINI_BASE_URL, DEFAULT_GENERATION_MODEL, DEFAULT_INDEX_NAME,
    DEFAULT_RETRIEVAL_K,
};
use pdf_qa_core::{
    chunk_spans, CharacterNgramEmbedder, ChunkOptions, Embedder, GeminiClient, GeminiConfig,
    GeminiEmbedder, GeminiGenerator, IndexingPipeline, LocalVectorStore, LopdfExtractor,
    PipelineConfig, QdrantStore, QueryPipeline, SplitPolicy, TextExtractor, VectorStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector store backend.
    #[arg(long, value_enum, default_value_t = Backend::Local, env = "PDF_QA_BACKEND")]
    backend: Backend,

    /// Directory holding the local vector store files.
    #[arg(long, default_value = ".pdf-qa", env = "PDF_QA_STORE_DIR")]
    store_dir: PathBuf,

    /// Name of the index documents are written to and searched in.
    #[arg(long, default_value = DEFAULT_INDEX_NAME, env = "PDF_QA_INDEX")]
    index_name: String,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333", env = "QDRANT_URL")]
    qdrant_url: String,

    /// Embedding provider. `ngram` works offline.
    #[arg(long, value_enum, default_value_t = EmbedderKind::Gemini, env = "PDF_QA_EMBEDDER")]
    embedder: EmbedderKind,

    /// Gemini API key (falls back to GOOGLE_API_KEY).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Generative Language API base URL
    #[arg(long, default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// Generation model
    #[arg(long, default_value = DEFAULT_GENERATION_MODEL)]
    model: String,

    /// Embedding model
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and index one PDF file.
    Index {
        /// PDF file to index.
        #[arg(long)]
        file: PathBuf,
    },
    /// Answer a question from the indexed documents.
    Ask {
        /// Question about the document.
        #[arg(long)]
        question: String,
    },
    /// Show the chunks retrieved for a query, without generating an answer.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value_t = DEFAULT_RETRIEVAL_K)]
        k: usize,
    },
    /// Print how a PDF would be chunked. Nothing is indexed.
    Chunk {
        /// PDF file to chunk.
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = ChunkOptions::default().min_length)]
        min_length: usize,
        #[arg(long, default_value_t = ChunkOptions::default().max_length)]
        max_length: usize,
        #[arg(long, default_value_t = ChunkOptions::default().overlap)]
        overlap: usize,
        #[arg(long, value_enum, default_value_t = Policy::Sentence)]
        split: Policy,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Local,
    Qdrant,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Gemini,
    Ngram,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    Sentence,
    Character,
}

impl From<Policy> for SplitPolicy {
    fn from(value: Policy) -> Self {
        match value {
            Policy::Sentence => SplitPolicy::Sentence,
            Policy::Character => SplitPolicy::Character,
        }
    }
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_index_name(&self.index_name)
            .with_generation_model(&self.model)
    }

    fn gemini_client(&self) -> anyhow::Result<GeminiClient> {
        let config = match &self.api_key {
            Some(api_key) => GeminiConfig::new(api_key)?,
            None => GeminiConfig::from_env()?,
        };
        let config = config
            .with_base_url(&self.gemini_base_url)?
            .with_embedding_model(&self.embedding_model);
        Ok(GeminiClient::new(config))
    }

    fn embedder(&self) -> anyhow::Result<Box<dyn Embedder>> {
        let embedder: Box<dyn Embedder> = match self.embedder {
            EmbedderKind::Gemini => Box::new(GeminiEmbedder::new(self.gemini_client()?)),
            EmbedderKind::Ngram => Box::new(CharacterNgramEmbedder::default()),
        };
        Ok(embedder)
    }

    fn store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        let embedder = self.embedder()?;
        let store: Arc<dyn VectorStore> = match self.backend {
            Backend::Local => Arc::new(LocalVectorStore::persistent(&self.store_dir, embedder)),
            Backend::Qdrant => Arc::new(QdrantStore::new(&self.qdrant_url, embedder)?),
        };
        Ok(store)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-qa boot"
    );

    match &cli.command {
        Command::Index { file } => {
            let pipeline = IndexingPipeline::new(LopdfExtractor, cli.store()?, cli.pipeline_config());
            pipeline.index_document(file).await?;

            println!(
                "indexed {} into {} at {}",
                file.display(),
                cli.index_name,
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask { question } => {
            let generator = GeminiGenerator::new(cli.gemini_client()?);
            let pipeline = QueryPipeline::new(cli.store()?, generator, cli.pipeline_config());
            let answer = pipeline.answer_question(question).await?;
            println!("{answer}");
        }
        Command::Search { query, k } => {
            let config = cli.pipeline_config().with_retrieval_k(*k);
            let pipeline = QueryPipeline::retrieval_only(cli.store()?, config);
            let documents = pipeline.retrieve(query).await?;

            println!("query: {query}");
            if documents.is_empty() {
                println!("no documents in index {}", cli.index_name);
            }
            for (rank, document) in documents.iter().enumerate() {
                println!("[{}] source={}", rank + 1, document.metadata.file_path);
                println!("{}\n", document.content);
            }
        }
        Command::Chunk {
            file,
            min_length,
            max_length,
            overlap,
            split,
        } => {
            let bytes = tokio::fs::read(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let text = LopdfExtractor.extract_text(&bytes)?;
            let options = ChunkOptions {
                min_length: *min_length,
                max_length: *max_length,
                overlap: *overlap,
                split_policy: (*split).into(),
            };

            let spans = chunk_spans(&text, &options)?;
            println!("{} chars -> {} chunks", text.chars().count(), spans.len());
            for (index, span) in spans.iter().enumerate() {
                println!("--- chunk {index} [{}..{}] len={}", span.start, span.end, span.len());
                println!("{}", span.text);
            }
        }
    }

    Ok(())
}
