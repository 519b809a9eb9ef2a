//! Token counting and raw token-window slicing.
//!
//! All chunk-size decisions in the pipeline are expressed in `cl100k_base`
//! tokens so sizes stay stable across calls. When the encoder cannot be
//! constructed the tokenizer degrades to a 4-characters-per-token
//! approximation; counting and slicing never fail.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Shared handle to the `cl100k_base` byte-pair encoder.
///
/// Cloning is cheap; the underlying encoder is reference counted. A handle
/// without an encoder (construction failed) stays fully functional through
/// the length approximation.
#[derive(Clone)]
pub struct Tokenizer {
    bpe: Option<Arc<CoreBPE>>,
}

impl Tokenizer {
    pub fn new() -> Self {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Self {
                bpe: Some(Arc::new(bpe)),
            },
            Err(err) => {
                warn!(
                    error = %err,
                    "cl100k encoder unavailable, falling back to length approximation"
                );
                Self { bpe: None }
            }
        }
    }

    /// Number of tokens in `text`. Falls back to `ceil(len / 4)` when the
    /// encoder is unavailable.
    pub fn count_tokens(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => approximate_tokens(text),
        }
    }

    /// Hard-slices `text` into successive windows of at most `max_tokens`
    /// tokens, consecutive windows sharing `overlap_tokens` tokens of context.
    ///
    /// The overlap is clamped to `max_tokens - 1` so every window advances the
    /// start offset and it can never underflow. The final window may be
    /// shorter than `max_tokens`.
    pub fn slice_by_tokens(
        &self,
        text: &str,
        max_tokens: usize,
        overlap_tokens: usize,
    ) -> Vec<String> {
        if text.is_empty() || max_tokens == 0 {
            return Vec::new();
        }
        let overlap = overlap_tokens.min(max_tokens - 1);

        let Some(bpe) = &self.bpe else {
            return slice_by_chars(text, max_tokens, overlap);
        };

        let ids = bpe.encode_ordinary(text);
        let mut windows = Vec::new();
        let mut start = 0usize;
        while start < ids.len() {
            let end = (start + max_tokens).min(ids.len());
            match bpe.decode(ids[start..end].to_vec()) {
                Ok(piece) => windows.push(piece),
                Err(err) => {
                    // A window boundary can land mid-character; the character
                    // fallback keeps the whole text covered.
                    warn!(error = %err, "token window decode failed, using character fallback");
                    return slice_by_chars(text, max_tokens, overlap);
                }
            }
            if end == ids.len() {
                break;
            }
            start = end - overlap;
        }
        windows
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

fn approximate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

fn slice_by_chars(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let window = max_tokens.saturating_mul(4).max(1);
    let overlap = overlap_tokens.saturating_mul(4).min(window - 1);

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + window).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Length of the longest suffix of `a` that is also a prefix of `b`.
    fn shared_overlap(a: &str, b: &str) -> usize {
        (1..=a.len().min(b.len()))
            .rev()
            .find(|&k| {
                a.is_char_boundary(a.len() - k) && b.is_char_boundary(k) && a[a.len() - k..] == b[..k]
            })
            .unwrap_or(0)
    }

    #[test]
    fn counts_are_positive_for_nonempty_text() {
        let tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.count_tokens(""), 0);
        assert!(tokenizer.count_tokens("hello world") >= 2);
    }

    #[test]
    fn windows_respect_the_token_budget() {
        let tokenizer = Tokenizer::new();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(40);
        let windows = tokenizer.slice_by_tokens(&text, 25, 5);
        assert!(windows.len() > 1);
        for window in &windows {
            assert!(tokenizer.count_tokens(window) <= 25);
        }
    }

    #[test]
    fn windows_cover_the_text_ends_and_overlap() {
        let tokenizer = Tokenizer::new();
        let text = "alpha beta gamma delta epsilon zeta eta theta ".repeat(30);
        let windows = tokenizer.slice_by_tokens(&text, 20, 4);
        assert!(windows.len() > 1);
        assert!(text.starts_with(windows.first().unwrap()));
        assert!(text.ends_with(windows.last().unwrap()));
        for pair in windows.windows(2) {
            assert!(
                shared_overlap(&pair[0], &pair[1]) > 0,
                "consecutive windows must share overlapping context"
            );
        }
    }

    #[test]
    fn short_text_yields_a_single_window() {
        let tokenizer = Tokenizer::new();
        let windows = tokenizer.slice_by_tokens("just a few words", 100, 10);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], "just a few words");
    }

    #[test]
    fn oversized_overlap_still_makes_progress() {
        let tokenizer = Tokenizer::new();
        let text = "word ".repeat(200);
        // overlap >= max would stall without clamping
        let windows = tokenizer.slice_by_tokens(&text, 10, 50);
        assert!(windows.len() > 1);
        assert!(windows.len() < 400, "clamped overlap must advance each window");
    }

    #[test]
    fn char_fallback_is_bounded_and_covering() {
        let windows = slice_by_chars("abcdefghij", 1, 0);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows.concat(), "abcdefghij");
    }
}
