//! Token estimates for embedding inputs and chat context

/// Rough estimate: ~4 characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// The longest prefix of `text` estimated to fit in `max_tokens`, cut on a char boundary.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Token allowance for the context of one chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub tokens_per_request: usize,
    pub tokens_used: usize,
}

impl Budget {
    pub fn new(tokens_per_request: usize) -> Self {
        Self {
            tokens_per_request,
            tokens_used: 0,
        }
    }

    /// Reserve room for `text`; returns false (and reserves nothing) if it does not fit.
    pub fn try_spend(&mut self, text: &str) -> bool {
        let cost = estimate_tokens(text);
        if self.tokens_used + cost > self.tokens_per_request {
            return false;
        }
        self.tokens_used += cost;
        true
    }

    pub fn remaining(&self) -> usize {
        self.tokens_per_request.saturating_sub(self.tokens_used)
    }
}
