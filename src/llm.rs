use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GenerationError {
    #[error("{provider} error ({status}): {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("model call timed out")]
    Timeout,

    #[error("invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::ModelBackend(err.to_string())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs may carry credentials.
        let err = err.without_url();
        if err.is_timeout() {
            GenerationError::Timeout
        } else if err.is_decode() {
            GenerationError::InvalidResponse(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

/// A text-generation backend. Returns the generated text, which may be empty.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

async fn with_timeout<F>(timeout: Duration, fut: F) -> Result<String, GenerationError>
where
    F: std::future::Future<Output = Result<String, GenerationError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(GenerationError::Timeout))
}

// --- Gemini ---

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// First part of the first candidate, or every part of it joined by newlines.
    pub fn text(&self) -> String {
        let Some(parts) = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| &c.parts)
        else {
            return String::new();
        };

        match parts.first().and_then(|p| p.text.as_deref()) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => parts
                .iter()
                .map(|p| p.text.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, temperature: f32, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            timeout,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                provider: "Gemini",
                status: status.as_u16(),
                body,
            });
        }

        let json: GenerateContentResponse = res.json().await?;
        Ok(json.text())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        with_timeout(self.timeout, self.call(prompt)).await
    }
}

// --- OpenRouter ---

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    site_url: Option<String>,
    site_name: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, temperature: f32, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            timeout,
            site_url: None,
            site_name: None,
        }
    }

    /// Attribution headers OpenRouter shows on its dashboards.
    pub fn with_site(mut self, url: Option<String>, name: Option<String>) -> Self {
        self.site_url = url;
        self.site_name = name;
        self
    }

    async fn call(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut request = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .json(&body);

        if let Some(url) = &self.site_url {
            request = request.header("HTTP-Referer", url);
        }

        if let Some(name) = &self.site_name {
            request = request.header("X-Title", name);
        }

        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                provider: "OpenRouter",
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = res.json().await?;
        Ok(chat_completion_text(&json))
    }
}

fn chat_completion_text(json: &serde_json::Value) -> String {
    json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        with_timeout(self.timeout, self.call(prompt)).await
    }
}
