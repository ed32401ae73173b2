use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text of one non-empty PDF page, numbered by its original 1-indexed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub text: String,
    pub source_path: String,
    pub page_number: u32,
}

/// A bounded slice of a single page's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub page_number: u32,
    pub source_path: String,
}

/// A chunk with its normalized embedding, as persisted in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub text: String,
    pub page_number: u32,
    pub source_path: String,
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            text: chunk.text.clone(),
            page_number: chunk.page_number,
            source_path: chunk.source_path.clone(),
            embedding,
        }
    }
}

/// One ranked hit from a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub text: String,
    pub page_number: u32,
    pub source_path: String,
    pub score: f32,
}

/// Identity of the document an index was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_name: String,
    pub source_path: String,
    pub checksum: String,
}

/// Metadata written next to the vectors of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub collection: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub record_count: usize,
    pub document: Option<DocumentFingerprint>,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    /// Unique page numbers in first-seen ranked order.
    pub sources: Vec<u32>,
    /// Raw retrieved chunk texts, in ranked order.
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 500,
            chunk_overlap_chars: 100,
        }
    }
}
