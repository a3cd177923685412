/*!
 * Translation of subtitle entries through an LLM provider.
 *
 * - `client`: one external call per batch, strict response validation
 * - `batch`: batching, paced waves and progress reporting
 * - `prompts`: prompt templates and the request payload
 */

// Re-export main types for easier usage
pub use self::batch::{BatchScheduler, SchedulerLimits};
pub use self::client::{GeminiTranslationClient, LlmTranslationClient, TranslationClient, TranslationMap};
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod batch;
pub mod client;
pub mod prompts;
