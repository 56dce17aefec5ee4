/*!
 * Translation of document blocks through a chat-completion endpoint.
 *
 * - `glossary`: terminology table and relevant-term extraction
 * - `prompt`: request construction
 * - `retry`: reusable retry policy with per-reason backoff
 * - `client`: bounded-concurrency client that never fails a call
 */

pub mod client;
pub mod glossary;
pub mod prompt;
pub mod retry;

pub use self::client::{
    ClientOptions, FAILED_SENTINEL, INVALID_RESPONSE_SENTINEL, TranslationClient, TranslationRequest,
    is_sentinel,
};
pub use self::glossary::{Glossary, GlossaryEntry};
pub use self::prompt::PromptSettings;
pub use self::retry::{Attempt, Backoff, RetryPolicy, RetryReason};
