/*!
 * Mock provider implementations for testing.
 *
 * The mock speaks the Gemini wire types so the real translation client can be
 * exercised end to end without network access:
 * - `MockProvider::working()` - Echoes every entry back as `[TRANSLATED] text`
 * - `MockProvider::omitting(ids)` - Like working, but leaves the given ids out
 * - `MockProvider::failing_on(n, kind)` - Fails only on the n-th call
 * - `MockProvider::malformed()` / `empty()` - Answers that are not a JSON array
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::gemini::{GenerateContentRequest, GenerateContentResponse};

/// Failure to simulate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockErrorType {
    /// HTTP 429
    RateLimit,
    /// HTTP 401
    Auth,
    /// Transport failure
    Connection,
    /// HTTP 500
    Server,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds but drops the listed ids from the answer
    Omitting(Vec<u64>),
    /// Fails on the given one-based call number, succeeds otherwise
    FailOnCall { call: usize, error: MockErrorType },
    /// Always fails
    Failing(MockErrorType),
    /// Returns text that is not JSON
    Malformed,
    /// Returns a response without candidates
    Empty,
}

/// One request observed by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Ids sent in the request payload
    pub ids: Vec<u64>,
    /// System instruction text
    pub system: String,
    /// Time the call started
    pub started_at: Instant,
}

#[derive(Deserialize)]
struct PayloadItem {
    id: u64,
    text: String,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Simulated latency of every call
    delay: Duration,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Calls seen so far, shared between clones
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that leaves some ids untranslated
    pub fn omitting(ids: Vec<u64>) -> Self {
        Self::new(MockBehavior::Omitting(ids))
    }

    /// Create a mock that fails only on the given call
    pub fn failing_on(call: usize, error: MockErrorType) -> Self {
        Self::new(MockBehavior::FailOnCall { call, error })
    }

    /// Create a failing mock provider that always errors
    pub fn failing(error: MockErrorType) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Create a mock that answers with invalid JSON
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Add simulated latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the calls made so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn simulated_error(error: MockErrorType) -> ProviderError {
        match error {
            MockErrorType::RateLimit => ProviderError::RateLimitExceeded("Simulated 429 Too Many Requests".to_string()),
            MockErrorType::Auth => ProviderError::AuthenticationError("Simulated invalid API key".to_string()),
            MockErrorType::Connection => ProviderError::ConnectionError("Simulated connection reset".to_string()),
            MockErrorType::Server => ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            },
        }
    }

    /// Generate a well-formed answer for the given payload
    pub fn generate_batch_response(payload: &str, omit: &[u64]) -> String {
        let items: Vec<PayloadItem> = serde_json::from_str(payload).unwrap_or_default();
        let translated: Vec<_> = items
            .iter()
            .filter(|item| !omit.contains(&item.id))
            .map(|item| json!({"id": item.id, "translatedText": format!("[TRANSLATED] {}", item.text)}))
            .collect();
        serde_json::Value::Array(translated).to_string()
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = GenerateContentRequest;
    type Response = GenerateContentResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        let ids = serde_json::from_str::<Vec<PayloadItem>>(request.prompt_text())
            .map(|items| items.into_iter().map(|item| item.id).collect())
            .unwrap_or_default();
        self.calls.lock().push(RecordedCall {
            ids,
            system: request.system_text().to_string(),
            started_at: Instant::now(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behavior {
            MockBehavior::Working => Ok(GenerateContentResponse::from_text(
                Self::generate_batch_response(request.prompt_text(), &[]),
            )),
            MockBehavior::Omitting(ids) => Ok(GenerateContentResponse::from_text(
                Self::generate_batch_response(request.prompt_text(), ids),
            )),
            MockBehavior::FailOnCall { call: failing_call, error } if *failing_call == call => {
                Err(Self::simulated_error(*error))
            }
            MockBehavior::FailOnCall { .. } => Ok(GenerateContentResponse::from_text(
                Self::generate_batch_response(request.prompt_text(), &[]),
            )),
            MockBehavior::Failing(error) => Err(Self::simulated_error(*error)),
            MockBehavior::Malformed => Ok(GenerateContentResponse::from_text("Sure! Here is your translation:")),
            MockBehavior::Empty => Ok(GenerateContentResponse::default()),
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.behavior {
            MockBehavior::Failing(error) => Err(Self::simulated_error(*error)),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.candidates.first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}
