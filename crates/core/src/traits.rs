use crate::{AnswerError, IndexError, RetrievedChunk};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex {
    /// Returns at most `top_k` records ranked by descending similarity.
    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError>;
}

#[async_trait]
pub trait LanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerError>;
}
