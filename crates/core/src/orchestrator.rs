use crate::embeddings::Embedder;
use crate::llm::{ChatCompletionsClient, LlmSettings};
use crate::prompt::{format_context, render_prompt};
use crate::retriever::Retriever;
use crate::traits::{LanguageModel, VectorIndex};
use crate::{AnswerError, AnswerResult, RetrievedChunk};
use std::collections::HashSet;
use tracing::info;

/// Retrieve, build the prompt, call the model, and collect page citations.
pub struct AnswerComposer<'a, V: ?Sized, E: ?Sized, L> {
    retriever: Retriever<'a, V, E>,
    model: L,
}

impl<'a, V, E, L> AnswerComposer<'a, V, E, L>
where
    V: VectorIndex + Sync + ?Sized,
    E: Embedder + ?Sized,
    L: LanguageModel,
{
    pub fn new(index: &'a V, embedder: &'a E, model: L) -> Self {
        Self {
            retriever: Retriever::new(index, embedder),
            model,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<AnswerResult, AnswerError> {
        // One retrieval feeds both the prompt and the citation list.
        let hits = self.retriever.retrieve(question).await?;

        let prompt = render_prompt(&format_context(&hits), question);
        let answer = self.model.generate(&prompt).await?;

        let sources = cite_pages(&hits);
        info!(hits = hits.len(), sources = ?sources, "answered question");

        Ok(AnswerResult {
            answer: answer.trim().to_string(),
            sources,
            chunks: hits.into_iter().map(|hit| hit.text).collect(),
        })
    }
}

/// Unique page numbers in first-seen ranked order.
pub fn cite_pages(hits: &[RetrievedChunk]) -> Vec<u32> {
    let mut seen = HashSet::new();
    hits.iter()
        .map(|hit| hit.page_number)
        .filter(|page| seen.insert(*page))
        .collect()
}

/// Answers against an open index using the hosted model described by `settings`.
///
/// The credential is checked before retrieval, so a missing key never touches
/// the index or the network.
pub async fn answer_with_citations<V, E>(
    question: &str,
    index: &V,
    embedder: &E,
    settings: &LlmSettings,
) -> Result<AnswerResult, AnswerError>
where
    V: VectorIndex + Sync + ?Sized,
    E: Embedder + ?Sized,
{
    let model = ChatCompletionsClient::new(settings.resolve()?)?;
    AnswerComposer::new(index, embedder, model)
        .answer(question)
        .await
}
