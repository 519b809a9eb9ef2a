//! Recursive separator-driven splitting of oversized sections.
//!
//! The splitter tries separators in priority order, from paragraph breaks down
//! to single spaces, and only falls back to hard token-window slicing when no
//! separator can help (minified JSON, very long URLs, and similar unbroken
//! runs). Structural splits carry no overlap; overlap is introduced only at
//! the token-window fallback, where a forced cut would otherwise sever
//! context.

use super::tokenizer::Tokenizer;

/// Separator priority order: paragraph break, line break, single space, then
/// character level. The empty separator routes to the raw token-window
/// fallback.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursively splits `text` into pieces of at most `max_tokens` tokens,
/// appending trimmed pieces to `out`.
///
/// Recursion depth is bounded by the separator list length, which is fixed
/// and small.
pub fn split_recursive(
    tokenizer: &Tokenizer,
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
    separators: &[&str],
    out: &mut Vec<String>,
) {
    if text.trim().is_empty() {
        return;
    }
    if tokenizer.count_tokens(text) <= max_tokens {
        out.push(text.trim().to_string());
        return;
    }

    let Some((separator, narrower)) = separators.split_first() else {
        out.extend(
            tokenizer
                .slice_by_tokens(text, max_tokens, overlap_tokens)
                .into_iter()
                .map(|piece| piece.trim().to_string()),
        );
        return;
    };

    if separator.is_empty() || !text.contains(separator) {
        split_recursive(tokenizer, text, max_tokens, overlap_tokens, narrower, out);
        return;
    }

    // Greedily accumulate parts up to the budget; anything that would
    // overflow a non-empty buffer flushes into the next narrower separator.
    let mut buffer = String::new();
    for part in text.split(separator) {
        let candidate = if buffer.is_empty() {
            part.to_string()
        } else {
            format!("{buffer}{separator}{part}")
        };
        if tokenizer.count_tokens(&candidate) > max_tokens && !buffer.is_empty() {
            split_recursive(tokenizer, &buffer, max_tokens, overlap_tokens, narrower, out);
            buffer = part.to_string();
        } else {
            buffer = candidate;
        }
    }
    if !buffer.is_empty() {
        split_recursive(tokenizer, &buffer, max_tokens, overlap_tokens, narrower, out);
    }
}
