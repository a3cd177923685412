use std::time::Duration;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use reqwest::{Client, StatusCode};
use log::{debug, error};

use crate::errors::ProviderError;
use super::Provider;

/// Default public endpoint of the Generative Language API
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Gemini client for the `generateContent` API
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (empty means the public API)
    endpoint: String,
    /// Model identifier, e.g. "gemini-3-flash-preview"
    model: String,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// System instruction guiding the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Conversation turns
    pub contents: Vec<Content>,

    /// Sampling and output settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// A conversation turn made of text parts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    /// Role of the author (user, model); omitted for system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Text parts of the turn
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single text part
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    /// Text content
    #[serde(default)]
    pub text: String,
}

/// Generation settings
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// MIME type of the answer, "application/json" for structured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,

    /// OpenAPI-style schema the answer must follow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// Token usage information
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_token_count: u64,
    /// Number of generated tokens
    #[serde(default)]
    pub candidates_token_count: u64,
    /// Total tokens billed
    #[serde(default)]
    pub total_token_count: u64,
}

/// One generated candidate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content, absent when the candidate was blocked
    #[serde(default)]
    pub content: Option<Content>,

    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response body of `generateContent`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Token usage information
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentRequest {
    /// Create a request with a single user turn
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt.into() }],
            }],
            generation_config: None,
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(Content {
            role: None,
            parts: vec![Part { text: system.into() }],
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .temperature = Some(temperature);
        self
    }

    /// Ask for a JSON answer matching the given schema
    pub fn json_schema(mut self, schema: serde_json::Value) -> Self {
        let config = self.generation_config.get_or_insert_with(GenerationConfig::default);
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(schema);
        self
    }

    /// Text of the first user turn
    pub fn prompt_text(&self) -> &str {
        self.contents
            .first()
            .and_then(|content| content.parts.first())
            .map(|part| part.text.as_str())
            .unwrap_or_default()
    }

    /// Text of the system instruction, empty when unset
    pub fn system_text(&self) -> &str {
        self.system_instruction
            .as_ref()
            .and_then(|content| content.parts.first())
            .map(|part| part.text.as_str())
            .unwrap_or_default()
    }
}

impl GenerateContentResponse {
    /// Build a response carrying one text candidate
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part { text: text.into() }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            usage_metadata: None,
        }
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Model this client talks to
    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_GEMINI_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/v1beta/models/{}", base, self.model)
    }

    // @returns: Classified error for a non-success HTTP status
    fn status_error(status: StatusCode, body: String) -> ProviderError {
        match status.as_u16() {
            429 => ProviderError::RateLimitExceeded(body),
            401 | 403 => ProviderError::AuthenticationError(body),
            code => ProviderError::ApiError {
                status_code: code,
                message: body,
            },
        }
    }

    fn send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() || e.is_connect() {
            ProviderError::ConnectionError(e.to_string())
        } else {
            ProviderError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl Provider for Gemini {
    type Request = GenerateContentRequest;
    type Response = GenerateContentResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let api_url = format!("{}:generateContent", self.model_url());
        debug!("Sending generateContent request to {}", api_url);

        let response = self.client.post(&api_url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(Self::status_error(status, error_text));
        }

        response.json::<GenerateContentResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Gemini API response: {}", e)))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self.client.get(self.model_url())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(Self::send_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(Self::status_error(status, error_text))
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.candidates.first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}
