/*!
 * Transport implementations for the chat-completion endpoint.
 *
 * - `openai`: OpenAI-compatible HTTP client built on reqwest
 * - `mock`: scripted in-process transport for tests
 *
 * Transports only move bytes and report the HTTP status. Classifying a
 * response as success, retryable or fatal is the translation client's job.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::providers::openai::ChatCompletionRequest;

/// Raw reply from the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, unparsed
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error describing a non-2xx reply
    pub fn to_error(&self) -> ProviderError {
        match self.status {
            429 => ProviderError::RateLimitExceeded(self.body.clone()),
            status => ProviderError::ApiError { status_code: status, message: self.body.clone() },
        }
    }
}

/// Common trait for anything that can deliver a chat-completion request
///
/// An `Err` means no HTTP response was obtained (timeout, connection failure).
#[async_trait]
pub trait ChatTransport: Send + Sync + Debug {
    /// Send one request and return the status and body
    async fn send(&self, request: &ChatCompletionRequest) -> Result<TransportResponse, ProviderError>;
}

pub mod mock;
pub mod openai;
