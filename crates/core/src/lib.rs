pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod retriever;
pub mod session;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, ChunkingConfig, RecursiveCharacterSplitter, DEFAULT_SEPARATORS};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingBackend, OpenAiCompatibleEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS, REMOTE_EMBEDDING_MODEL,
};
pub use error::{AnswerError, IndexError, IngestError};
pub use extractor::{load_pdf, LopdfExtractor, PdfExtractor};
pub use ingest::{
    digest_bytes, ingest_file, ingest_upload, load_and_chunk, rebuild_index, IngestionReport,
};
pub use llm::{
    ChatCompletionsClient, LlmConfig, LlmSettings, API_KEY_VAR, DEFAULT_LLM_BASE_URL,
    DEFAULT_LLM_MODEL,
};
pub use models::{
    AnswerResult, Chunk, DocumentFingerprint, IndexManifest, IngestionOptions, PageDocument,
    RetrievedChunk, VectorRecord,
};
pub use orchestrator::{answer_with_citations, cite_pages, AnswerComposer};
pub use prompt::{format_context, render_prompt, NO_ANSWER_FALLBACK};
pub use retriever::{Retriever, TOP_K};
pub use session::{ChatTurn, LoadOutcome, Role, Session};
pub use stores::{
    clear_collection, IndexLocation, LocalVectorStore, DEFAULT_COLLECTION, DEFAULT_INDEX_DIR,
};
pub use traits::{LanguageModel, VectorIndex};
