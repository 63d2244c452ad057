//! Rough token estimate for prompt-size logging.
//!
//! Character based (~4 characters per token), so it works for any
//! OpenAI-compatible provider without a tokenizer.

pub struct TokenCounter;

impl TokenCounter {
    pub fn estimate_tokens(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() + 3) / 4
    }

    /// Estimate for a chat request given as `(role, content)` pairs,
    /// including ~4 tokens of framing per message.
    pub fn estimate_messages_tokens(messages: &[(&str, &str)]) -> usize {
        let framing = messages.len() * 4;
        let content: usize = messages
            .iter()
            .map(|(role, content)| Self::estimate_tokens(&format!("{}: {}", role, content)))
            .sum();
        framing + content
    }
}
