use crate::embeddings::Embedder;
use crate::stores::{clear_collection, IndexLocation, LocalVectorStore};
use crate::{build_chunks, load_pdf, Chunk, DocumentFingerprint, IngestError, IngestionOptions};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of indexing one document.
#[derive(Debug)]
pub struct IngestionReport {
    pub document: DocumentFingerprint,
    pub page_count: usize,
    pub chunk_count: usize,
    pub store: LocalVectorStore,
}

pub fn load_and_chunk(path: &Path, options: &IngestionOptions) -> Result<Vec<Chunk>, IngestError> {
    let pages = load_pdf(path)?;
    build_chunks(&pages, options)
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Indexes an uploaded document given as raw bytes.
///
/// The bytes are parsed from a scoped temporary `.pdf` file that is removed on
/// every exit path. Chunks are labelled with `document_name` since the
/// temporary path does not outlive the call.
pub async fn ingest_upload<E>(
    document_name: &str,
    bytes: &[u8],
    options: &IngestionOptions,
    location: IndexLocation,
    embedder: &E,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + ?Sized,
{
    ingest_upload_in(
        &std::env::temp_dir(),
        document_name,
        bytes,
        options,
        location,
        embedder,
    )
    .await
}

async fn ingest_upload_in<E>(
    scratch_dir: &Path,
    document_name: &str,
    bytes: &[u8],
    options: &IngestionOptions,
    location: IndexLocation,
    embedder: &E,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + ?Sized,
{
    let (page_count, mut chunks) = {
        let mut upload = tempfile::Builder::new()
            .prefix("docqa-upload-")
            .suffix(".pdf")
            .tempfile_in(scratch_dir)?;
        upload.write_all(bytes)?;
        upload.flush()?;

        let pages = load_pdf(upload.path())?;
        (pages.len(), build_chunks(&pages, options)?)
    };

    for chunk in &mut chunks {
        chunk.source_path = document_name.to_string();
    }

    let document = DocumentFingerprint {
        document_name: document_name.to_string(),
        source_path: document_name.to_string(),
        checksum: digest_bytes(bytes),
    };

    index_document(document, page_count, chunks, location, embedder).await
}

/// Indexes a PDF already on disk.
pub async fn ingest_file<E>(
    path: &Path,
    options: &IngestionOptions,
    location: IndexLocation,
    embedder: &E,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + ?Sized,
{
    let document_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
        .to_string();

    let bytes = tokio::fs::read(path).await?;
    let pages = load_pdf(path)?;
    let chunks = build_chunks(&pages, options)?;

    let document = DocumentFingerprint {
        document_name,
        source_path: path.to_string_lossy().to_string(),
        checksum: digest_bytes(&bytes),
    };

    index_document(document, pages.len(), chunks, location, embedder).await
}

/// Replaces whatever index lives at `location` with one built from `chunks`.
///
/// Only the collection's own directory is removed, and that removal is best
/// effort; a failure is logged and the build proceeds.
pub async fn rebuild_index<E>(
    chunks: &[Chunk],
    location: IndexLocation,
    embedder: &E,
    document: Option<DocumentFingerprint>,
) -> Result<LocalVectorStore, IngestError>
where
    E: Embedder + ?Sized,
{
    match clear_collection(&location).await {
        Ok(true) => info!(path = %location.collection_dir().display(), "cleared previous index"),
        Ok(false) => {}
        Err(error) => warn!(
            path = %location.collection_dir().display(),
            error = %error,
            "could not clear old index"
        ),
    }

    Ok(LocalVectorStore::build(location, chunks, embedder, document).await?)
}

async fn index_document<E>(
    document: DocumentFingerprint,
    page_count: usize,
    chunks: Vec<Chunk>,
    location: IndexLocation,
    embedder: &E,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + ?Sized,
{
    if chunks.is_empty() {
        return Err(IngestError::NoReadableText(document.document_name));
    }

    let store = rebuild_index(&chunks, location, embedder, Some(document.clone())).await?;
    info!(
        document = %document.document_name,
        pages = page_count,
        chunks = chunks.len(),
        "document indexed"
    );

    Ok(IngestionReport {
        document,
        page_count,
        chunk_count: chunks.len(),
        store,
    })
}
