use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{IndexError, RetrievedChunk};
use tracing::debug;

/// Number of chunks fetched per question.
pub const TOP_K: usize = 5;

/// Plain similarity search with a fixed `TOP_K`; no reranking or score cutoff.
pub struct Retriever<'a, V: ?Sized, E: ?Sized> {
    index: &'a V,
    embedder: &'a E,
}

impl<'a, V, E> Retriever<'a, V, E>
where
    V: VectorIndex + Sync + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(index: &'a V, embedder: &'a E) -> Self {
        Self { index, embedder }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, IndexError> {
        let query_vector = self.embedder.embed_query(question).await?;
        let hits = self.index.search_vector(&query_vector, TOP_K).await?;
        debug!(hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }
}
