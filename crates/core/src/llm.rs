//! Chat-completions client for the answering model.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. The default
//! target is Groq's hosted Llama model with zero temperature.

use crate::error::AnswerError;
use crate::traits::LanguageModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Unvalidated model settings as gathered from flags or the environment.
#[derive(Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: lookup(API_KEY_VAR),
            ..Self::default()
        }
    }

    /// Validates the settings. A missing or blank key fails before any request is made.
    pub fn resolve(&self) -> Result<LlmConfig, AnswerError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AnswerError::MissingCredential {
                variable: API_KEY_VAR.to_string(),
            })?;

        let model = self.model.trim();
        if model.is_empty() {
            return Err(AnswerError::InvalidConfig("model name is empty".to_string()));
        }

        Ok(LlmConfig {
            api_key: api_key.to_string(),
            base_url: Url::parse(self.base_url.trim())?,
            model: model.to_string(),
            temperature: 0.0,
        })
    }
}

#[derive(Clone)]
pub struct LlmConfig {
    api_key: String,
    pub base_url: Url,
    pub model: String,
    pub temperature: f32,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    config: LlmConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: LlmConfig) -> Result<Self, AnswerError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.as_str().trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            stream: false,
        };

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "calling model");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(AnswerError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AnswerError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str) -> LlmSettings {
        LlmSettings {
            api_key: Some("test-key".to_string()),
            base_url: base_url.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }

    #[test]
    fn missing_or_blank_key_is_a_configuration_error() {
        let missing = LlmSettings::from_lookup(|_| None).resolve().unwrap_err();
        assert!(matches!(missing, AnswerError::MissingCredential { .. }));
        assert!(missing.to_string().contains(API_KEY_VAR));

        let blank = LlmSettings::from_lookup(|_| Some("   ".to_string()))
            .resolve()
            .unwrap_err();
        assert!(matches!(blank, AnswerError::MissingCredential { .. }));
    }

    #[test]
    fn key_is_read_from_lookup_and_never_printed() {
        let settings = LlmSettings::from_lookup(|name| {
            (name == API_KEY_VAR).then(|| "secret-value".to_string())
        });
        let config = settings.resolve().unwrap();

        assert_eq!(config.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.temperature, 0.0);
        assert!(!format!("{settings:?}").contains("secret-value"));
        assert!(!format!("{config:?}").contains("secret-value"));
    }

    #[test]
    fn from_env_reads_the_process_environment() {
        let from_env = LlmSettings::from_env();
        let from_lookup = LlmSettings::from_lookup(|name| std::env::var(name).ok());

        assert_eq!(from_env, from_lookup);
        assert_eq!(from_env.api_key, std::env::var(API_KEY_VAR).ok());
        assert_eq!(from_env.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(from_env.model, DEFAULT_LLM_MODEL);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let error = settings("not a url").resolve().unwrap_err();
        assert!(matches!(error, AnswerError::Url(_)));
    }

    #[tokio::test]
    async fn generate_sends_deterministic_request_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": DEFAULT_LLM_MODEL,
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "prompt text"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Forty bar.  "}}]
            })))
            .mount(&server)
            .await;

        let config = settings(&format!("{}/openai/v1", server.uri()))
            .resolve()
            .unwrap();
        let client = ChatCompletionsClient::new(config).unwrap();

        let answer = client.generate("prompt text").await.unwrap();
        assert_eq!(answer, "  Forty bar.  ");
    }

    #[tokio::test]
    async fn backend_failures_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::new(settings(&server.uri()).resolve().unwrap()).unwrap();

        let error = client.generate("prompt").await.unwrap_err();
        match error {
            AnswerError::Backend { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
