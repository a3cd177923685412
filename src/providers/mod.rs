/*!
 * LLM provider clients.
 *
 * - `gemini`: Google Generative Language API (`generateContent`)
 * - `mock`: scripted stand-in speaking the Gemini wire types, for tests
 *
 * A provider only moves requests and responses over the wire and reports
 * transport-level failures as `ProviderError`. Prompt building and response
 * validation live in `translation::client`.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Transport to one LLM backend
///
/// Implementations perform exactly one HTTP exchange per `complete` call and
/// never retry on their own.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Wire request body
    type Request: Send + Sync;

    /// Wire response body
    type Response: Send + Sync;

    /// Send one request and return the decoded response
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Cheap reachability and credential check, no generation involved
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Generated text of a response, empty when the model produced none
    fn extract_text(response: &Self::Response) -> String;
}

pub mod gemini;
pub mod mock;
