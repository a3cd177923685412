/*!
 * Prompt construction for batch subtitle translation.
 *
 * This module provides:
 * - The system prompt template with the per-job style hint
 * - The `{id, text}` request payload and the expected response schema
 */

pub mod templates;

// Re-export main types
pub use templates::{DEFAULT_STYLE, EntryToTranslate, PromptTemplate, TranslationPromptBuilder};
