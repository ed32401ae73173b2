use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use docqa_core::{
    answer_with_citations, ingest_file, load_and_chunk, AnswerResult, CharacterNgramEmbedder,
    EmbeddingBackend, IndexLocation, IngestionOptions, LlmSettings, LoadOutcome,
    LocalVectorStore, OpenAiCompatibleEmbedder, Session, API_KEY_VAR, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_INDEX_DIR, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
    REMOTE_EMBEDDING_MODEL,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CONTEXT_PREVIEW_CHARS: usize = 500;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions about a PDF with page citations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the persisted vector index
    #[arg(long, env = "DOCQA_INDEX_DIR", default_value = DEFAULT_INDEX_DIR, global = true)]
    index_dir: PathBuf,

    /// Collection name inside the index directory
    #[arg(long, env = "DOCQA_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    collection: String,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args)]
struct EmbeddingArgs {
    /// OpenAI-compatible embeddings base URL; the local hashing embedder is used when unset
    #[arg(long, env = "DOCQA_EMBEDDING_URL", global = true)]
    embedding_url: Option<String>,

    /// Embedding model served at --embedding-url
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = REMOTE_EMBEDDING_MODEL, global = true)]
    embedding_model: String,

    /// Bearer token for the embeddings endpoint
    #[arg(long, env = "DOCQA_EMBEDDING_API_KEY", hide_env_values = true, global = true)]
    embedding_api_key: Option<String>,

    /// Vector dimension produced by the embedder
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS, global = true)]
    embedding_dimensions: usize,
}

#[derive(Args)]
struct LlmArgs {
    /// API key for the answering model; falls back to GROQ_API_KEY
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// OpenAI-compatible chat completions base URL
    #[arg(long, env = "DOCQA_LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL, global = true)]
    llm_base_url: String,

    /// Answering model name
    #[arg(long, env = "DOCQA_LLM_MODEL", default_value = DEFAULT_LLM_MODEL, global = true)]
    llm_model: String,
}

#[derive(Args, Clone, Copy)]
struct ChunkArgs {
    /// Maximum characters per chunk
    #[arg(long, default_value_t = 500)]
    chunk_size: usize,

    /// Characters shared between neighbouring chunks of a page
    #[arg(long, default_value_t = 100)]
    chunk_overlap: usize,
}

impl From<ChunkArgs> for IngestionOptions {
    fn from(value: ChunkArgs) -> Self {
        Self {
            chunk_max_chars: value.chunk_size,
            chunk_overlap_chars: value.chunk_overlap,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Replace the index with one built from a PDF.
    Ingest {
        /// PDF to index
        #[arg(long)]
        pdf: PathBuf,
        #[command(flatten)]
        chunking: ChunkArgs,
    },
    /// Answer one question against the persisted index.
    Ask {
        /// Question to answer
        #[arg(long)]
        question: String,
        /// Print the retrieved chunks under the answer.
        #[arg(long, default_value_t = false)]
        show_context: bool,
    },
    /// Upload a PDF and chat about it interactively (/clear resets the chat, /quit exits).
    Chat {
        /// PDF to load
        #[arg(long)]
        pdf: PathBuf,
        /// Print the retrieved chunks under each answer.
        #[arg(long, default_value_t = false)]
        show_context: bool,
        #[command(flatten)]
        chunking: ChunkArgs,
    },
    /// Preview how a PDF is split into chunks.
    Chunks {
        /// PDF to split
        #[arg(long)]
        pdf: PathBuf,
        /// Number of chunks to print.
        #[arg(long, default_value = "3")]
        limit: usize,
        #[command(flatten)]
        chunking: ChunkArgs,
    },
}

impl Cli {
    fn location(&self) -> IndexLocation {
        IndexLocation::new(&self.index_dir, &self.collection)
    }

    fn llm_settings(&self) -> LlmSettings {
        let from_env = LlmSettings::from_env();
        LlmSettings {
            api_key: self.llm.api_key.clone().or(from_env.api_key),
            base_url: self.llm.llm_base_url.clone(),
            model: self.llm.llm_model.clone(),
        }
    }

    fn embedder(&self) -> anyhow::Result<EmbeddingBackend> {
        let args = &self.embedding;
        match &args.embedding_url {
            Some(url) => Ok(EmbeddingBackend::Remote(OpenAiCompatibleEmbedder::new(
                url,
                &args.embedding_model,
                args.embedding_api_key.clone(),
                args.embedding_dimensions,
            )?)),
            None => Ok(EmbeddingBackend::Local(CharacterNgramEmbedder {
                dimensions: args.embedding_dimensions,
            })),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            eprintln!("could not read .env file: {error}");
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docqa boot"
    );

    let embedder = cli.embedder()?;

    match &cli.command {
        Command::Ingest { pdf, chunking } => {
            let report = ingest_file(pdf, &(*chunking).into(), cli.location(), &embedder)
                .await
                .map_err(|error| anyhow::anyhow!("error processing PDF: {error}"))?;

            println!(
                "Ready! Loaded {} chunks from {} page(s) of {} at {}",
                report.chunk_count,
                report.page_count,
                report.document.document_name,
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask {
            question,
            show_context,
        } => {
            let store = LocalVectorStore::load(cli.location(), &embedder)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let result = answer_with_citations(question, &store, &embedder, &cli.llm_settings())
                .await
                .map_err(|error| anyhow::anyhow!("error generating answer: {error}"))?;

            print_answer(&result, *show_context);
        }
        Command::Chat {
            pdf,
            show_context,
            chunking,
        } => {
            let mut session = Session::new(
                cli.location(),
                (*chunking).into(),
                embedder,
                cli.llm_settings(),
            );
            upload(&mut session, pdf).await?;
            chat_loop(&mut session, *show_context).await?;
        }
        Command::Chunks {
            pdf,
            limit,
            chunking,
        } => {
            let chunks = load_and_chunk(pdf, &(*chunking).into())
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{} chunks", chunks.len());
            for (index, chunk) in chunks.iter().take(*limit).enumerate() {
                println!("\n[Chunk {}] Page {}", index + 1, chunk.page_number);
                println!("{}", preview(&chunk.text, 300));
                println!("...");
            }
        }
    }

    Ok(())
}

async fn upload(session: &mut Session<EmbeddingBackend>, pdf: &Path) -> anyhow::Result<()> {
    let name = pdf
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", pdf.display()))?
        .to_string();
    let bytes = tokio::fs::read(pdf).await?;

    match session.load_document(&name, &bytes).await {
        Ok(LoadOutcome::Indexed { chunks }) => println!("Ready! Loaded {chunks} chunks."),
        Ok(LoadOutcome::AlreadyLoaded) => println!("{name} is loaded."),
        Err(error) => anyhow::bail!("error processing PDF: {error}"),
    }
    Ok(())
}

async fn chat_loop(
    session: &mut Session<EmbeddingBackend>,
    show_context: bool,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Ask a question about your document (/clear, /quit):");

    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_history();
                println!("Chat cleared.");
                continue;
            }
            _ => {}
        }

        match session.ask(question).await {
            Ok(result) => print_answer(&result, show_context),
            Err(error) => {
                warn!(error = %error, "question failed");
                eprintln!(
                    "Error generating answer: {error}\n\nCheck that your {API_KEY_VAR} is set correctly in your .env file."
                );
            }
        }
    }

    Ok(())
}

fn print_answer(result: &AnswerResult, show_context: bool) {
    println!("{}", result.answer);

    if !result.sources.is_empty() {
        let pages = result
            .sources
            .iter()
            .map(|page| format!("Page {page}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Sources: {pages}");
    }

    if show_context {
        for (index, chunk) in result.chunks.iter().enumerate() {
            println!("\n--- Chunk {} ---", index + 1);
            println!("{}", preview(chunk, CONTEXT_PREVIEW_CHARS));
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
