/*!
 * Tests for the translation client over the mock transport
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bilingual_book::providers::mock::{MockReply, MockTransport, echo_translation};
use bilingual_book::translation::{
    FAILED_SENTINEL, INVALID_RESPONSE_SENTINEL, TranslationClient, TranslationRequest,
};

use crate::common::{client_options, mock_client};

fn requests(texts: &[&str]) -> Vec<TranslationRequest> {
    texts
        .iter()
        .map(|text| TranslationRequest { text: text.to_string(), glossary_terms: Vec::new() })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_translate_rateLimitedOnce_shouldSucceedAfterOneSecondBackoff() {
    let transport = Arc::new(MockTransport::scripted([
        MockReply::Status(429),
        MockReply::Success("  你好，世界  ".to_string()),
    ]));
    let client = mock_client(transport.clone(), 2);

    let result = client.translate("Hello World", &[]).await;

    assert_eq!(result, "你好，世界");
    assert_eq!(transport.request_count(), 2);
    let gaps = transport.call_gaps();
    assert_eq!(gaps.len(), 1);
    assert!(gaps[0] >= Duration::from_secs(1));
    assert!(gaps[0] < Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_translate_clientError_shouldReturnSentinelWithoutRetry() {
    let transport = Arc::new(MockTransport::always(MockReply::Status(404)));
    let client = mock_client(transport.clone(), 2);

    let result = client.translate("Hello World", &[]).await;

    assert_eq!(result, "[Translation Error: 404]");
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_translate_malformedPayload_shouldReturnInvalidResponseSentinel() {
    let transport = Arc::new(MockTransport::always(MockReply::Raw {
        status: 200,
        body: r#"{"choices": []}"#.to_string(),
    }));
    let client = mock_client(transport.clone(), 2);

    assert_eq!(client.translate("Hello", &[]).await, INVALID_RESPONSE_SENTINEL);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_translate_serverErrorsExhaustAttempts_shouldReturnFailedSentinel() {
    let transport = Arc::new(MockTransport::always(MockReply::Status(503)));
    let client = mock_client(transport.clone(), 2);

    let result = client.translate("Hello", &[]).await;

    assert_eq!(result, FAILED_SENTINEL);
    assert_eq!(transport.request_count(), 3);
    // Fixed pause between attempts, none after the last one
    for gap in transport.call_gaps() {
        assert!(gap >= Duration::from_secs(1));
        assert!(gap < Duration::from_millis(1500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_translate_timeoutThenSuccess_shouldRetry() {
    let transport = Arc::new(MockTransport::scripted([MockReply::Timeout, MockReply::ConnectionFailure]));
    let client = mock_client(transport.clone(), 2);

    let result = client.translate("Hello", &[]).await;

    assert_eq!(result, echo_translation("Hello"));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_translate_repeatedRateLimits_shouldUseNonDecreasingBackoff() {
    let transport = Arc::new(MockTransport::always(MockReply::Status(429)));
    let client = TranslationClient::new(transport.clone(), client_options(1, 4));

    let result = client.translate("Hello", &[]).await;

    assert_eq!(result, FAILED_SENTINEL);
    assert_eq!(transport.request_count(), 4);
    let gaps = transport.call_gaps();
    assert_eq!(gaps.len(), 3);
    assert!(gaps.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(gaps[2] >= Duration::from_secs(4));
}

#[tokio::test]
async fn test_translate_whitespaceOnly_shouldNotCallEndpoint() {
    let transport = Arc::new(MockTransport::working());
    let client = mock_client(transport.clone(), 2);

    assert_eq!(client.translate(" \n\t ", &[]).await, "");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_translate_withGlossaryTerms_shouldExtendSystemMessage() {
    let transport = Arc::new(MockTransport::working());
    let client = mock_client(transport.clone(), 2);
    let terms = vec![("Red Shift".to_string(), "红移".to_string())];

    client.translate("Red Shift grows.", &terms).await;

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    let system = sent[0].message("system").unwrap();
    assert!(system.starts_with("Translate to Chinese."));
    assert!(system.contains("Red Shift → 红移"));
    assert!(sent[0].message("user").unwrap().contains("Red Shift grows."));
    assert!(!sent[0].stream);
}

#[tokio::test(start_paused = true)]
async fn test_translateAll_shouldNeverExceedConcurrencyLimit() {
    let transport = Arc::new(MockTransport::working().with_latency(Duration::from_millis(200)));
    let client = mock_client(transport.clone(), 3);
    let texts: Vec<String> = (0..12).map(|i| format!("paragraph {}", i)).collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();

    let results = client.translate_all(&requests(&texts), |_, _| {}).await;

    assert_eq!(results.len(), 12);
    assert_eq!(transport.request_count(), 12);
    assert!(transport.max_in_flight() <= 3);
    assert!(transport.max_in_flight() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_translateAll_withMixedOutcomes_shouldKeepRequestOrder() {
    let transport = Arc::new(MockTransport::scripted([MockReply::Status(403)]));
    let client = mock_client(transport.clone(), 1);

    let results = client
        .translate_all(&requests(&["first", "second", "third"]), |_, _| {})
        .await;

    assert_eq!(
        results,
        vec![
            "[Translation Error: 403]".to_string(),
            echo_translation("second"),
            echo_translation("third"),
        ]
    );
}

#[tokio::test]
async fn test_translateAll_shouldReportProgressForEveryRequest() {
    let transport = Arc::new(MockTransport::working());
    let client = mock_client(transport, 2);
    let calls = AtomicUsize::new(0);
    let last_total = AtomicUsize::new(0);

    client
        .translate_all(&requests(&["a", "b", "c", "d"]), |_, total| {
            calls.fetch_add(1, Ordering::SeqCst);
            last_total.store(total, Ordering::SeqCst);
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(last_total.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_translateAll_empty_shouldReturnNothing() {
    let client = mock_client(Arc::new(MockTransport::working()), 2);
    assert!(client.translate_all(&[], |_, _| {}).await.is_empty());
}
