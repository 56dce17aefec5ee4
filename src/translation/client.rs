/*!
 * Bounded-concurrency translation client.
 *
 * Every call resolves to a string: either the translated text or one of the
 * sentinels below. Failures never surface as errors, so a batch of concurrent
 * translations always completes as a whole.
 */

use futures::stream::{self, StreamExt};
use log::{error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::errors::ProviderError;
use crate::providers::openai::ChatCompletionResponse;
use crate::providers::{ChatTransport, TransportResponse};
use crate::translation::prompt::{self, PromptSettings};
use crate::translation::retry::{Attempt, RetryPolicy, RetryReason};

/// Returned when a 2xx response does not carry `choices[0].message.content`
pub const INVALID_RESPONSE_SENTINEL: &str = "[Translation Error: Invalid Response]";

/// Returned when every attempt was retried without success
pub const FAILED_SENTINEL: &str = "[Translation Failed]";

/// Sentinel for a non-retryable client error
pub fn client_error_sentinel(status: u16) -> String {
    format!("[Translation Error: {}]", status)
}

/// Whether a translation result is a failure marker rather than real text
pub fn is_sentinel(result: &str) -> bool {
    result == FAILED_SENTINEL
        || (result.starts_with("[Translation Error: ") && result.ends_with(']'))
}

/// One block to translate with its glossary subset
#[derive(Debug, Clone, Default)]
pub struct TranslationRequest {
    pub text: String,
    pub glossary_terms: Vec<(String, String)>,
}

/// Client settings derived from configuration
#[derive(Debug, Clone)]
pub struct ClientOptions {
    // @field: Admission gate size
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    pub prompt: PromptSettings,
}

/// Translation client shared by all concurrent block translations
#[derive(Debug, Clone)]
pub struct TranslationClient {
    transport: Arc<dyn ChatTransport>,
    gate: Arc<Semaphore>,
    options: ClientOptions,
}

/// Map one transport outcome to a finished result or a retry
fn classify(outcome: Result<TransportResponse, ProviderError>) -> Attempt<String> {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            warn!("Translation request failed: {}", e);
            return Attempt::Retry(RetryReason::Transient);
        }
    };

    if response.is_success() {
        return match ChatCompletionResponse::extract_content(&response.body) {
            Ok(content) => Attempt::Done(content.trim().to_string()),
            Err(e) => {
                error!("Unexpected response format ({}): {}", response.status, e);
                Attempt::Done(INVALID_RESPONSE_SENTINEL.to_string())
            }
        };
    }

    let failure = response.to_error();
    match &failure {
        ProviderError::RateLimitExceeded(_) => {
            warn!("{}", failure);
            Attempt::Retry(RetryReason::RateLimited)
        }
        ProviderError::ApiError { status_code: status @ 400..=499, .. } => {
            error!("{}", failure);
            Attempt::Done(client_error_sentinel(*status))
        }
        _ => {
            warn!("{}, will retry", failure);
            Attempt::Retry(RetryReason::Transient)
        }
    }
}

impl TranslationClient {
    /// Create a client over any transport
    pub fn new(transport: Arc<dyn ChatTransport>, options: ClientOptions) -> Self {
        let permits = options.max_concurrency.max(1);
        Self {
            transport,
            gate: Arc::new(Semaphore::new(permits)),
            options,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Translate one text span; never fails.
    ///
    /// Whitespace-only input returns an empty string without a request. The
    /// admission permit is held across retries and backoff sleeps.
    pub async fn translate(&self, text: &str, glossary_terms: &[(String, String)]) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let Ok(_permit) = self.gate.acquire().await else {
            return FAILED_SENTINEL.to_string();
        };

        let request = prompt::build_request(&self.options.prompt, text, glossary_terms);
        let request = &request;
        let transport = &self.transport;
        let result = self
            .options
            .retry
            .run(move |_| async move { classify(transport.send(request).await) })
            .await;

        result.unwrap_or_else(|| {
            error!("Translation failed after {} attempts", self.options.retry.max_attempts);
            FAILED_SENTINEL.to_string()
        })
    }

    /// Translate many spans concurrently.
    ///
    /// Results are returned in request order regardless of completion order.
    /// `progress` is called with `(completed, total)` after each request.
    pub async fn translate_all<F>(&self, requests: &[TranslationRequest], progress: F) -> Vec<String>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total = requests.len();
        let completed = AtomicUsize::new(0);
        let width = self.options.max_concurrency.max(1);

        let mut results = stream::iter(requests.iter().enumerate())
            .map(|(index, request)| {
                let completed = &completed;
                let progress = &progress;
                async move {
                    let translation = self.translate(&request.text, &request.glossary_terms).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(done, total);
                    (index, translation)
                }
            })
            .buffer_unordered(width)
            .collect::<Vec<_>>()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, translation)| translation).collect()
    }
}
