//! Chunked input buffering in front of the tokenizer.
//!
//! Network content arrives in arbitrary chunks; tag boundaries do not. The
//! incremental parser accumulates chunks and only surfaces tokens whose
//! source lies entirely before the last unambiguous boundary — the last `>`
//! seen so far. Everything after it stays buffered until more input (or the
//! end of the document) resolves it.

use crate::tokenizer::{Token, Tokenizer};

/// Streaming front-end for the tokenizer.
///
/// `feed` appends a chunk, `flush` returns the tokens newly settled by it,
/// `end` returns whatever remains once the document is complete.
///
/// The token stream returned across all `flush` calls plus the final `end`
/// call is exactly the single-pass tokenization of the concatenated input:
/// no token is returned twice, none is dropped, and none is returned in a
/// form a later chunk could revise. That holds because the tokenizer's
/// partial mode holds back unterminated constructs, which makes the token
/// list of a growing input an extension of the list of any shorter cut.
#[derive(Debug, Default)]
pub struct IncrementalParser {
    /// All input received so far.
    input: String,
    /// How many tokens of the current prefix tokenization have already been
    /// handed to the caller.
    emitted: usize,
}

impl IncrementalParser {
    /// Create an empty incremental parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of input. No tokenization happens until `flush`.
    pub fn feed(&mut self, chunk: &str) {
        self.input.push_str(chunk);
    }

    /// Tokenize up to the last unambiguous boundary and return the tokens
    /// added since the previous call.
    ///
    /// Returns an empty vector when no `>` has been seen yet.
    pub fn flush(&mut self) -> Vec<Token> {
        let Some(gt) = self.input.rfind('>') else {
            return Vec::new();
        };
        let mut tokenizer = Tokenizer::new_partial(&self.input[..=gt]);
        tokenizer.run();
        self.take_delta(tokenizer.into_tokens())
    }

    /// Tokenize the complete input, including a trailing fragment that
    /// never saw its closing `>`, and return the final batch of tokens.
    pub fn end(&mut self) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(&self.input);
        tokenizer.run();
        self.take_delta(tokenizer.into_tokens())
    }

    /// Feed a chunk and hand the newly settled tokens to `callback`.
    pub fn feed_with<F: FnMut(&[Token])>(&mut self, chunk: &str, mut callback: F) {
        self.feed(chunk);
        let tokens = self.flush();
        if !tokens.is_empty() {
            callback(&tokens);
        }
    }

    /// Discard all buffered input and emission bookkeeping.
    pub fn reset(&mut self) {
        self.input.clear();
        self.emitted = 0;
    }

    /// The input accumulated so far.
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.input
    }

    fn take_delta(&mut self, tokens: Vec<Token>) -> Vec<Token> {
        let delta = tokens.get(self.emitted..).map(<[Token]>::to_vec);
        self.emitted = tokens.len().max(self.emitted);
        delta.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_without_boundary_returns_nothing() {
        let mut parser = IncrementalParser::new();
        parser.feed("<p");
        assert!(parser.flush().is_empty());
    }

    #[test]
    fn reset_discards_buffered_input() {
        let mut parser = IncrementalParser::new();
        parser.feed("<p>hello");
        let _ = parser.flush();
        parser.reset();
        assert!(parser.buffered().is_empty());
        assert!(parser.end().is_empty());
    }

    #[test]
    fn feed_with_invokes_callback_on_new_tokens() {
        let mut parser = IncrementalParser::new();
        let mut seen = Vec::new();
        parser.feed_with("<p>", |tokens| seen.extend(tokens.to_vec()));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_start_tag(), Some("p"));
    }
}
