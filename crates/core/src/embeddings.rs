use crate::error::IndexError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Model served by an OpenAI-compatible embeddings endpoint when one is configured.
pub const REMOTE_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

const REMOTE_BATCH_SIZE: usize = 64;

/// Text-to-vector boundary. Indexing and querying must use the same model id.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> String;

    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| IndexError::CountMismatch {
            chunks: 1,
            embeddings: 0,
        })
    }
}

/// Scales a vector to unit length so a dot product equals cosine similarity.
pub fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Local hashed character-trigram embedder. Deterministic and network free.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn model_id(&self) -> String {
        format!("char-trigram-hash-{}", self.dimensions.max(1))
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

/// Embeddings client for any server speaking the OpenAI `/embeddings` format.
#[derive(Clone)]
pub struct OpenAiCompatibleEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

impl OpenAiCompatibleEmbedder {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: usize,
    ) -> Result<Self, IndexError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            dimensions,
        })
    }

    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let payload = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(IndexError::BackendResponse {
                backend: self.endpoint.clone(),
                details: format!("{status}: {body}"),
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(IndexError::CountMismatch {
                chunks: inputs.len(),
                embeddings: parsed.data.len(),
            });
        }

        parsed
            .data
            .into_iter()
            .map(|entry| {
                if entry.embedding.len() != self.dimensions {
                    return Err(IndexError::DimensionMismatch {
                        expected: self.dimensions,
                        got: entry.embedding.len(),
                    });
                }
                Ok(entry.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiCompatibleEmbedder {
    fn model_id(&self) -> String {
        self.model.clone()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(REMOTE_BATCH_SIZE) {
            vectors.extend(self.request_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Embedder chosen at startup.
#[derive(Clone)]
pub enum EmbeddingBackend {
    Local(CharacterNgramEmbedder),
    Remote(OpenAiCompatibleEmbedder),
}

#[async_trait]
impl Embedder for EmbeddingBackend {
    fn model_id(&self) -> String {
        match self {
            Self::Local(embedder) => embedder.model_id(),
            Self::Remote(embedder) => embedder.model_id(),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Self::Local(embedder) => embedder.dimensions(),
            Self::Remote(embedder) => embedder.dimensions(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        match self {
            Self::Local(embedder) => embedder.embed_batch(texts).await,
            Self::Remote(embedder) => embedder.embed_batch(texts).await,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Hydraulic pressure and flow");
        let second = embedder.embed("Hydraulic pressure and flow");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_unit_vectors_of_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed("abcdef");
        assert_eq!(vector.len(), 32);
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn normalize_leaves_zero_vectors_untouched() {
        let mut zero = vec![0.0f32; 4];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 4]);

        let mut vector = vec![3.0f32, 4.0];
        normalize(&mut vector);
        assert_eq!(vector, vec![0.6, 0.8]);
    }

    #[tokio::test]
    async fn remote_embedder_orders_vectors_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiCompatibleEmbedder::new(
            &format!("{}/v1/", server.uri()),
            REMOTE_EMBEDDING_MODEL,
            Some("test-key".to_string()),
            2,
        )
        .unwrap();

        let vectors = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn remote_embedder_rejects_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let embedder =
            OpenAiCompatibleEmbedder::new(&server.uri(), REMOTE_EMBEDDING_MODEL, None, 2).unwrap();

        let error = embedder.embed_query("question").await.unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        ));
    }

    #[tokio::test]
    async fn remote_embedder_surfaces_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let embedder =
            OpenAiCompatibleEmbedder::new(&server.uri(), REMOTE_EMBEDDING_MODEL, None, 2).unwrap();

        let error = embedder.embed_query("question").await.unwrap_err();
        assert!(error.to_string().contains("overloaded"));
    }
}
