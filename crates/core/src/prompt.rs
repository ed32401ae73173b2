use crate::RetrievedChunk;

/// Phrase the model is told to use when the context does not answer the question.
pub const NO_ANSWER_FALLBACK: &str =
    "I couldn't find relevant information in the document for this question.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const INSTRUCTIONS: &str = "You are a helpful assistant that answers questions based strictly on the
provided document context.

Rules:
- Only use information from the context below to answer.
- If the context doesn't contain enough information, say:";

const STYLE_RULES: &str = "- Be concise and direct. Avoid unnecessary filler phrases.
- Do not make up or infer information beyond what's in the context.";

/// Joins ranked chunks into one context block, each prefixed with its page.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[Page {}]\n{}", chunk.page_number, chunk.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Fills the fixed question-answering template.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "\n{INSTRUCTIONS}\n  \"{NO_ANSWER_FALLBACK}\"\n{STYLE_RULES}\n\nContext:\n{context}\n\nQuestion:\n{question}\n\nAnswer:\n"
    )
}
