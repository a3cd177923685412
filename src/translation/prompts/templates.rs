/*!
 * Prompt templates for batch subtitle translation.
 *
 * The model receives a fixed role directive, the per-job style hint and a
 * JSON array of `{id, text}` pairs, and must answer with a JSON array of
 * `{id, translatedText}` pairs.
 */

use serde::Serialize;
use serde_json::json;

use crate::subtitle_processor::SubtitleEntry;

/// Style used when the job has no style hint
pub const DEFAULT_STYLE: &str = "Professional, natural, and accurate.";

/// System prompt template for subtitle translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for batch subtitle translation.
    pub const BATCH_TRANSLATOR: &'static str = r#"You are a professional subtitle translator.
Translate the text to {target_language}.
- Style: {style}
- Rules: NO extra text, ONLY the JSON array.
- Input: JSON array with 'id' and 'text'.
- Output: JSON array with 'id' and 'translatedText', one object per input id."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default batch translator template.
    pub fn batch_translator() -> Self {
        Self::new(Self::BATCH_TRANSLATOR)
    }

    /// Render the template with the given variables.
    ///
    /// A blank style falls back to [`DEFAULT_STYLE`].
    pub fn render(&self, target_language: &str, style: &str) -> String {
        let style = style.trim();
        let style = if style.is_empty() { DEFAULT_STYLE } else { style };
        self.template
            .replace("{target_language}", target_language)
            .replace("{style}", style)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::batch_translator()
    }
}

/// Entry as sent to the model: no timing information
#[derive(Debug, Clone, Serialize)]
pub struct EntryToTranslate<'a> {
    /// Entry id, echoed back by the model
    pub id: u64,
    /// Text to translate
    pub text: &'a str,
}

/// Builder for constructing batch translation prompts.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    template: PromptTemplate,
    target_language: String,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(target_language: &str) -> Self {
        Self {
            template: PromptTemplate::default(),
            target_language: target_language.to_string(),
        }
    }

    /// Build the system instruction for one job.
    pub fn build_system_prompt(&self, style_hint: &str) -> String {
        self.template.render(&self.target_language, style_hint)
    }

    /// Build the user payload: a JSON array of `{id, text}`.
    pub fn build_user_prompt(&self, entries: &[SubtitleEntry]) -> serde_json::Result<String> {
        let payload: Vec<EntryToTranslate> = entries
            .iter()
            .map(|entry| EntryToTranslate { id: entry.id, text: &entry.text })
            .collect();
        serde_json::to_string(&payload)
    }

    /// Schema the answer must follow.
    pub fn response_schema() -> serde_json::Value {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "id": { "type": "INTEGER" },
                    "translatedText": { "type": "STRING" }
                },
                "required": ["id", "translatedText"]
            }
        })
    }
}
