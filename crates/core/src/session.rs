use crate::embeddings::Embedder;
use crate::ingest::ingest_upload;
use crate::llm::LlmSettings;
use crate::orchestrator::answer_with_citations;
use crate::stores::{IndexLocation, LocalVectorStore};
use crate::{AnswerError, AnswerResult, IndexError, IngestError, IngestionOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    /// Cited pages; empty for user turns.
    pub sources: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The same document name is already loaded; nothing was rebuilt.
    AlreadyLoaded,
    Indexed { chunks: usize },
}

/// Per-user conversation state: the active index, the loaded document and the chat log.
pub struct Session<E> {
    location: IndexLocation,
    options: IngestionOptions,
    embedder: E,
    llm: LlmSettings,
    index: Option<LocalVectorStore>,
    document_name: Option<String>,
    history: Vec<ChatTurn>,
}

impl<E: Embedder> Session<E> {
    pub fn new(
        location: IndexLocation,
        options: IngestionOptions,
        embedder: E,
        llm: LlmSettings,
    ) -> Self {
        Self {
            location,
            options,
            embedder,
            llm,
            index: None,
            document_name: None,
            history: Vec::new(),
        }
    }

    /// Attaches the index already persisted at the session's location.
    pub async fn open_existing(&mut self) -> Result<(), IndexError> {
        let store = LocalVectorStore::load(self.location.clone(), &self.embedder).await?;
        self.document_name = store
            .manifest()
            .document
            .as_ref()
            .map(|document| document.document_name.clone());
        self.index = Some(store);
        self.history.clear();
        Ok(())
    }

    /// Indexes an uploaded document, replacing the active index and clearing the chat.
    ///
    /// Uploading the name that is already loaded is a no-op. A document that
    /// fails to parse leaves the previous index active. A failure while
    /// rebuilding the index detaches it, since its files are already gone.
    pub async fn load_document(
        &mut self,
        document_name: &str,
        bytes: &[u8],
    ) -> Result<LoadOutcome, IngestError> {
        if self.index.is_some() && self.document_name.as_deref() == Some(document_name) {
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let report = match ingest_upload(
            document_name,
            bytes,
            &self.options,
            self.location.clone(),
            &self.embedder,
        )
        .await
        {
            Ok(report) => report,
            Err(error) => {
                if matches!(error, IngestError::Index(_)) {
                    self.index = None;
                    self.document_name = None;
                    self.history.clear();
                }
                return Err(error);
            }
        };

        let chunks = report.chunk_count;
        self.index = Some(report.store);
        self.document_name = Some(report.document.document_name);
        self.history.clear();
        Ok(LoadOutcome::Indexed { chunks })
    }

    /// Records the question, answers it, and records the answer with its citations.
    pub async fn ask(&mut self, question: &str) -> Result<AnswerResult, AnswerError> {
        let index = self.index.as_ref().ok_or(AnswerError::NoDocumentLoaded)?;

        self.history.push(ChatTurn {
            role: Role::User,
            content: question.to_string(),
            sources: Vec::new(),
        });

        let result = answer_with_citations(question, index, &self.embedder, &self.llm).await?;

        self.history.push(ChatTurn {
            role: Role::Assistant,
            content: result.answer.clone(),
            sources: result.sources.clone(),
        });
        Ok(result)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }
}
