/*!
 * Translation client: one external call per batch of subtitle entries.
 *
 * The client builds the request from `{id, text}` pairs and the job's style
 * hint, validates the answer against a strict schema and classifies failures.
 * It never retries; retrying is a user decision taken above the scheduler.
 */

use std::collections::HashMap;
use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::providers::Provider;
use crate::providers::gemini::{Gemini, GenerateContentRequest, GenerateContentResponse};
use crate::subtitle_processor::SubtitleEntry;

use super::prompts::TranslationPromptBuilder;

/// Translated text keyed by entry id
pub type TranslationMap = HashMap<u64, String>;

/// Anything that can translate one batch of entries
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Translate a batch, returning translated text keyed by entry id
    ///
    /// The result may lack some ids; callers keep the original text for those.
    async fn translate_batch(
        &self,
        entries: &[SubtitleEntry],
        style_hint: &str,
    ) -> Result<TranslationMap, TranslationError>;
}

/// One element of the model's answer; both fields are mandatory
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedItem {
    /// Id of the entry this translation belongs to
    pub id: u64,
    /// Translated text
    pub translated_text: String,
}

/// Translation client backed by an LLM provider speaking the Gemini wire types
#[derive(Debug)]
pub struct LlmTranslationClient<P> {
    provider: P,
    prompts: TranslationPromptBuilder,
    temperature: Option<f32>,
}

/// Translation client talking to the real Gemini API
pub type GeminiTranslationClient = LlmTranslationClient<Gemini>;

impl GeminiTranslationClient {
    /// Create a client from the application configuration
    pub fn from_config(config: &Config) -> Self {
        let translation = &config.translation;
        let provider = Gemini::new(
            translation.get_api_key(),
            translation.endpoint.clone(),
            translation.model.clone(),
            translation.timeout_secs,
        );
        Self::new(provider, &config.target_language).with_temperature(translation.temperature)
    }
}

impl<P> LlmTranslationClient<P>
where
    P: Provider<Request = GenerateContentRequest, Response = GenerateContentResponse>,
{
    /// Create a client translating into the given language
    pub fn new(provider: P, target_language: &str) -> Self {
        Self {
            provider,
            prompts: TranslationPromptBuilder::new(target_language),
            temperature: None,
        }
    }

    /// Set the sampling temperature sent with every request
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Access the underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build the request for one batch
    pub fn build_request(
        &self,
        entries: &[SubtitleEntry],
        style_hint: &str,
    ) -> Result<GenerateContentRequest, TranslationError> {
        let payload = self.prompts.build_user_prompt(entries)
            .map_err(|e| TranslationError::Unknown(format!("Failed to encode batch: {}", e)))?;

        let mut request = GenerateContentRequest::new(payload)
            .system(self.prompts.build_system_prompt(style_hint))
            .json_schema(TranslationPromptBuilder::response_schema());
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        Ok(request)
    }

    /// Validate the model's answer and index it by id
    pub fn parse_response(text: &str) -> Result<TranslationMap, TranslationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TranslationError::MalformedResponse("model returned an empty response".to_string()));
        }

        let items: Vec<TranslatedItem> = serde_json::from_str(trimmed).map_err(|e| {
            error!("Malformed JSON from model: {}", trimmed);
            TranslationError::MalformedResponse(format!(
                "expected a JSON array of {{id, translatedText}}: {}", e
            ))
        })?;

        Ok(items.into_iter().map(|item| (item.id, item.translated_text)).collect())
    }
}

#[async_trait]
impl<P> TranslationClient for LlmTranslationClient<P>
where
    P: Provider<Request = GenerateContentRequest, Response = GenerateContentResponse>,
{
    async fn translate_batch(
        &self,
        entries: &[SubtitleEntry],
        style_hint: &str,
    ) -> Result<TranslationMap, TranslationError> {
        let request = self.build_request(entries, style_hint)?;
        debug!("Translating batch of {} entries", entries.len());

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Token usage: {} prompt, {} completion",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        let translations = Self::parse_response(&P::extract_text(&response))?;

        debug!("Model returned {} of {} translations", translations.len(), entries.len());
        Ok(translations)
    }
}
