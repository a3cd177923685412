/*!
 * # srtbatch - batch subtitle translation with an LLM
 *
 * A Rust library for translating SRT subtitle files in batches through the
 * Gemini API while staying under the provider's rate limits.
 *
 * ## Features
 *
 * - Lenient SRT parsing (missing ids, `.` or `,` separators, BOM, CRLF)
 * - Strict SRT output with positional numbering
 * - Batches of 50 entries, two in flight, paced and cooled down between waves
 * - A sequential job queue where one failing file never stops the others
 * - Per-job style hints and progress reporting
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `subtitle_processor`: SRT parsing and serialization
 * - `providers`: LLM provider clients:
 *   - `providers::gemini`: Gemini `generateContent` client
 *   - `providers::mock`: scripted provider for tests
 * - `translation`: batch translation:
 *   - `translation::client`: one validated external call per batch
 *   - `translation::batch`: paced waves and progress
 *   - `translation::prompts`: prompt templates
 * - `app_controller`: job table and queue
 * - `app_config`: configuration management
 * - `file_utils`: file system operations
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, FileJob, JobId, JobState, QueueSummary, TranslatedFile};
pub use subtitle_processor::{SrtDocument, SubtitleEntry, parse_srt, serialize_srt};
pub use translation::{BatchScheduler, TranslationClient};
pub use errors::{AppError, BatchError, JobError, ProviderError, SubtitleError, TranslationError};
