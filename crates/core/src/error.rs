use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("document has no extractable text: {0}")]
    NoReadableText(String),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no vector store found at '{0}'; build an index from a document first")]
    NotFound(String),

    #[error("embedding dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("index was built with embedding model '{stored}' but queries use '{requested}'")]
    ModelMismatch { stored: String, requested: String },

    #[error("embedding count {embeddings} doesn't match chunk count {chunks}")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("{variable} not found. Add it to your .env file or export it in your shell.")]
    MissingCredential { variable: String },

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("model request failed ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("model returned no answer text")]
    EmptyResponse,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error("no document is loaded; upload a PDF before asking questions")]
    NoDocumentLoaded,
}
