use crate::embeddings::{normalize, Embedder};
use crate::traits::VectorIndex;
use crate::{Chunk, DocumentFingerprint, IndexError, IndexManifest, RetrievedChunk, VectorRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_INDEX_DIR: &str = "/tmp/docqa_store";
pub const DEFAULT_COLLECTION: &str = "doc_qa";

const INDEX_FILE_NAME: &str = "index.json";

/// Directory plus collection name identifying one persisted index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLocation {
    pub directory: PathBuf,
    pub collection: String,
}

impl Default for IndexLocation {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_DIR, DEFAULT_COLLECTION)
    }
}

impl IndexLocation {
    pub fn new(directory: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            collection: collection.into(),
        }
    }

    /// Directory owned by this collection. Nothing else is written under it.
    pub fn collection_dir(&self) -> PathBuf {
        self.directory.join(&self.collection)
    }

    pub fn collection_path(&self) -> PathBuf {
        self.collection_dir().join(INDEX_FILE_NAME)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedCollection {
    manifest: IndexManifest,
    records: Vec<VectorRecord>,
}

/// File-backed vector index holding one collection of normalized embeddings.
#[derive(Debug)]
pub struct LocalVectorStore {
    location: IndexLocation,
    manifest: IndexManifest,
    records: Vec<VectorRecord>,
}

impl LocalVectorStore {
    /// Embeds every chunk and writes the collection, overwriting any file already there.
    pub async fn build<E>(
        location: IndexLocation,
        chunks: &[Chunk],
        embedder: &E,
        document: Option<DocumentFingerprint>,
    ) -> Result<Self, IndexError>
    where
        E: Embedder + ?Sized,
    {
        info!(chunks = chunks.len(), model = %embedder.model_id(), "embedding chunks");

        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let dimensions = embedder.dimensions();
        let records = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, mut embedding)| {
                if embedding.len() != dimensions {
                    return Err(IndexError::DimensionMismatch {
                        expected: dimensions,
                        got: embedding.len(),
                    });
                }
                normalize(&mut embedding);
                Ok(VectorRecord::from_chunk(chunk, embedding))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        let manifest = IndexManifest {
            collection: location.collection.clone(),
            embedding_model: embedder.model_id(),
            dimensions,
            record_count: records.len(),
            document,
            built_at: Utc::now(),
        };

        let persisted = PersistedCollection { manifest, records };
        tokio::fs::create_dir_all(location.collection_dir()).await?;
        tokio::fs::write(location.collection_path(), serde_json::to_vec(&persisted)?).await?;

        info!(
            vectors = persisted.records.len(),
            path = %location.collection_path().display(),
            "stored vectors"
        );

        Ok(Self {
            location,
            manifest: persisted.manifest,
            records: persisted.records,
        })
    }

    /// Opens a persisted collection. The embedder must match the one used to build it.
    pub async fn load<E>(location: IndexLocation, embedder: &E) -> Result<Self, IndexError>
    where
        E: Embedder + ?Sized,
    {
        let path = location.collection_path();
        if !tokio::fs::try_exists(&path).await? {
            return Err(IndexError::NotFound(location.collection_dir().display().to_string()));
        }

        let bytes = tokio::fs::read(&path).await?;
        let persisted: PersistedCollection = serde_json::from_slice(&bytes)?;

        let requested = embedder.model_id();
        if persisted.manifest.embedding_model != requested {
            return Err(IndexError::ModelMismatch {
                stored: persisted.manifest.embedding_model,
                requested,
            });
        }
        if persisted.manifest.dimensions != embedder.dimensions() {
            return Err(IndexError::DimensionMismatch {
                expected: persisted.manifest.dimensions,
                got: embedder.dimensions(),
            });
        }

        info!(
            vectors = persisted.records.len(),
            path = %path.display(),
            "loaded existing vector store"
        );

        Ok(Self {
            location,
            manifest: persisted.manifest,
            records: persisted.records,
        })
    }

    /// Opens the collection if it exists, otherwise builds it from `chunks`.
    pub async fn get_or_create<E>(
        location: IndexLocation,
        chunks: Option<&[Chunk]>,
        embedder: &E,
        document: Option<DocumentFingerprint>,
    ) -> Result<Self, IndexError>
    where
        E: Embedder + ?Sized,
    {
        if tokio::fs::try_exists(location.collection_path()).await? {
            return Self::load(location, embedder).await;
        }

        match chunks {
            Some(chunks) => Self::build(location, chunks, embedder, document).await,
            None => Err(IndexError::NotFound(format!(
                "{} (and no chunks were provided to build one)",
                location.collection_dir().display()
            ))),
        }
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn location(&self) -> &IndexLocation {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VectorIndex for LocalVectorStore {
    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        if query_vector.len() != self.manifest.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.manifest.dimensions,
                got: query_vector.len(),
            });
        }

        let mut query = query_vector.to_vec();
        normalize(&mut query);

        let mut scored = self
            .records
            .iter()
            .map(|record| (dot(&query, &record.embedding), record))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        let hits = scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| RetrievedChunk {
                chunk_id: record.chunk_id.clone(),
                text: record.text.clone(),
                page_number: record.page_number,
                source_path: record.source_path.clone(),
                score,
            })
            .collect::<Vec<_>>();

        debug!(requested = top_k, returned = hits.len(), "similarity search");
        Ok(hits)
    }
}

/// Deletes the collection's own directory if present, leaving the rest of
/// `location.directory` untouched. Returns whether anything was removed.
pub async fn clear_collection(location: &IndexLocation) -> std::io::Result<bool> {
    let collection_dir = location.collection_dir();
    if !tokio::fs::try_exists(&collection_dir).await? {
        return Ok(false);
    }
    tokio::fs::remove_dir_all(&collection_dir).await?;
    Ok(true)
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}
