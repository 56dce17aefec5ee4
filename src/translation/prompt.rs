/*!
 * Chat request construction for block translation.
 */

use crate::providers::openai::{ChatCompletionRequest, ChatMessage};
use crate::translation::glossary::Glossary;

/// Heading placed before the per-block glossary in the system message
pub const GLOSSARY_SECTION_HEADER: &str = "\n\nUse the following specific glossary for this section:\n";

/// Fixed request parameters shared by every translation call
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
}

/// System instruction, extended with the glossary subset when one is given
pub fn system_message(system_prompt: &str, glossary_terms: &[(String, String)]) -> String {
    if glossary_terms.is_empty() {
        return system_prompt.to_string();
    }
    format!(
        "{}{}{}",
        system_prompt,
        GLOSSARY_SECTION_HEADER,
        Glossary::format_for_prompt(glossary_terms)
    )
}

/// User turn wrapping the source text
pub fn user_message(text: &str) -> String {
    format!("Original Text:\n{}\n\nTranslation:", text)
}

/// Recover the source text from a user turn built by `user_message`
pub fn source_text(user_content: &str) -> Option<&str> {
    user_content
        .strip_prefix("Original Text:\n")?
        .strip_suffix("\n\nTranslation:")
}

/// Build the full chat-completion request for one block
pub fn build_request(
    settings: &PromptSettings,
    text: &str,
    glossary_terms: &[(String, String)],
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: settings.model.clone(),
        messages: vec![
            ChatMessage::system(system_message(&settings.system_prompt, glossary_terms)),
            ChatMessage::user(user_message(text)),
        ],
        stream: false,
        temperature: settings.temperature,
    }
}
