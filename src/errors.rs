/*!
 * Error types for srtbatch.
 *
 * Transport failures (`ProviderError`) are classified into the four
 * translation failure kinds (`TranslationError`) at the client boundary;
 * the scheduler wraps them with the failing batch number and the controller
 * turns them into a job's `last_error`.
 */

use thiserror::Error;

/// Transport-level failure talking to an LLM backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP exchange could not be completed
    #[error("Request to the model API failed: {0}")]
    RequestFailed(String),

    /// The body did not decode into the expected wire type
    #[error("Could not decode model API response: {0}")]
    ParseError(String),

    /// Non-success status not covered by a more specific variant
    #[error("Model API returned HTTP {status_code}: {message}")]
    ApiError {
        status_code: u16,
        /// Response body, as returned
        message: String,
    },

    /// Timeout, refused or reset connection
    #[error("Could not reach the model API: {0}")]
    ConnectionError(String),

    /// HTTP 429
    #[error("Model API quota exhausted: {0}")]
    RateLimitExceeded(String),

    /// HTTP 401/403
    #[error("Model API rejected the credentials: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// The file did not contain a single usable subtitle block
    #[error("No subtitle entries found in {file_name}")]
    NoEntries {
        /// Name of the rejected file
        file_name: String,
    },
}

/// Semantic failure of a single batch translation call
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The provider throttled the request (HTTP 429)
    #[error("Rate limited by the translation API, slow down and retry later: {0}")]
    RateLimited(String),

    /// The credential was rejected (HTTP 401/403)
    #[error("API key is invalid or lacks permission: {0}")]
    Unauthorized(String),

    /// The model answered with something other than the expected JSON array
    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),

    /// Anything else, carrying the underlying message
    #[error("Translation request failed: {0}")]
    Unknown(String),
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::RateLimitExceeded(message) => Self::RateLimited(message),
            ProviderError::AuthenticationError(message) => Self::Unauthorized(message),
            ProviderError::ApiError { status_code: 429, message } => Self::RateLimited(message),
            ProviderError::ApiError { status_code: 401 | 403, message } => Self::Unauthorized(message),
            ProviderError::ParseError(message) => Self::MalformedResponse(message),
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Errors raised by the batch scheduler
#[derive(Error, Debug)]
pub enum BatchError {
    /// One chunk failed, which fails the whole run
    #[error("Batch {batch} failed: {source}")]
    TranslationFailed {
        /// One-based index of the failing batch
        batch: usize,
        /// Underlying client error
        #[source]
        source: TranslationError,
    },
}

/// Errors returned by the job controller to its callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// No job with that id
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job is being processed or is queued in the active run
    #[error("Job {0} is busy")]
    Busy(String),

    /// The job has no translated output yet
    #[error("Job {0} is not completed")]
    NotCompleted(String),

    /// The job finished; its prompt and output are frozen
    #[error("Job {0} is already completed")]
    AlreadyCompleted(String),

    /// The job has nothing to translate (its file failed to parse)
    #[error("Job {0} has no subtitle entries")]
    NoEntries(String),
}

/// Top-level error for callers that want a single type
#[derive(Error, Debug)]
pub enum AppError {
    /// Reading or writing a subtitle file
    #[error("I/O failure: {0}")]
    File(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Job(#[from] JobError),

    /// Configuration and other edge failures
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
