/*!
 * Mock transport for testing.
 *
 * `MockTransport` replays a script of replies (HTTP status, malformed payload,
 * timeout, ...) and then falls back to a default behavior. It also tracks how
 * many requests were in flight at once and when each call arrived, which is
 * what concurrency and backoff tests assert on.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::ProviderError;
use crate::providers::openai::ChatCompletionRequest;
use crate::providers::{ChatTransport, TransportResponse};
use crate::translation::prompt;

/// One scripted reply
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// 200 with a well-formed payload carrying this content
    Success(String),
    /// 200 with a well-formed payload echoing the source text with a prefix
    Echo,
    /// Given status with an empty JSON body
    Status(u16),
    /// Given status and raw body
    Raw { status: u16, body: String },
    /// The request timed out
    Timeout,
    /// The connection could not be established
    ConnectionFailure,
}

/// Behavior once the script is exhausted
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Echo the source text as `[ZH] <text>`
    Working,
    /// Always return this reply
    Always(MockReply),
}

/// Scripted chat transport with in-flight accounting
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockReply>>,
    behavior: MockBehavior,
    // @field: Simulated latency per request
    latency: Duration,
    request_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

/// Build a well-formed completion body
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

/// Deterministic fake translation used by `MockBehavior::Working`
pub fn echo_translation(source: &str) -> String {
    format!("[ZH] {}", source)
}

impl MockTransport {
    /// Create a mock with the specified fallback behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            behavior,
            latency: Duration::ZERO,
            request_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that replays `replies` and then echoes
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let mock = Self::working();
        mock.script.lock().extend(replies);
        mock
    }

    /// Create a mock that always returns the same reply
    pub fn always(reply: MockReply) -> Self {
        Self::new(MockBehavior::Always(reply))
    }

    /// Add simulated latency to every request
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of requests observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Arrival time of each request
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().clone()
    }

    /// Gaps between consecutive requests
    pub fn call_gaps(&self) -> Vec<Duration> {
        self.call_times()
            .windows(2)
            .map(|pair| pair[1].duration_since(pair[0]))
            .collect()
    }

    /// Every request received, in arrival order
    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().clone()
    }

    fn next_reply(&self) -> MockReply {
        if let Some(reply) = self.script.lock().pop_front() {
            return reply;
        }
        match &self.behavior {
            MockBehavior::Working => MockReply::Echo,
            MockBehavior::Always(reply) => reply.clone(),
        }
    }

    fn render(reply: MockReply, request: &ChatCompletionRequest) -> Result<TransportResponse, ProviderError> {
        match reply {
            MockReply::Success(content) => Ok(TransportResponse::new(200, completion_body(&content))),
            MockReply::Echo => {
                let source = request
                    .message("user")
                    .and_then(prompt::source_text)
                    .unwrap_or_default();
                Ok(TransportResponse::new(200, completion_body(&echo_translation(source))))
            }
            MockReply::Status(status) => Ok(TransportResponse::new(status, "{}")),
            MockReply::Raw { status, body } => Ok(TransportResponse::new(status, body)),
            MockReply::Timeout => Err(ProviderError::Timeout(60)),
            MockReply::ConnectionFailure => {
                Err(ProviderError::ConnectionError("Simulated connection failure".to_string()))
            }
        }
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, request: &ChatCompletionRequest) -> Result<TransportResponse, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().push(Instant::now());
        self.requests.lock().push(request.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let reply = self.next_reply();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Self::render(reply, request)
    }
}
