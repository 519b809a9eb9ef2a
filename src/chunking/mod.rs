//! Document chunking: structural splitting, recursive token-budget splitting,
//! and chunk assembly.
//!
//! ```text
//! markdown ──► sections::split_by_headings ──► [Section]
//!                                                 │
//!                        splitter::split_recursive (uses tokenizer)
//!                                                 │
//!                              assemble::assemble ──► [Chunk]
//! ```
//!
//! The hybrid strategy preserves document structure first (headings), natural
//! language boundaries second (paragraphs, lines, words), and only hard-slices
//! by tokens for pathological unbroken text.

pub mod assemble;
pub mod sections;
pub mod splitter;
pub mod tokenizer;

pub use assemble::{Chunk, ChunkMetadata, assemble};
pub use sections::{DOCUMENT_HEADING, DOCUMENT_START_HEADING, Section, split_by_headings};
pub use splitter::{DEFAULT_SEPARATORS, split_recursive};
pub use tokenizer::Tokenizer;

use tracing::debug;

/// Chunks a markdown document end to end: heading sections, recursive
/// splitting under `max_tokens`, and dense re-indexing into [`Chunk`] records.
///
/// Each section is chunked as `"{heading}\n{body}"` so every piece retains its
/// structural context. `max_tokens` is clamped to at least one token.
pub fn chunk_markdown(
    tokenizer: &Tokenizer,
    markdown: &str,
    title: &str,
    source: &str,
    max_tokens: usize,
    overlap_tokens: usize,
) -> Vec<Chunk> {
    let max_tokens = max_tokens.max(1);
    let total_tokens = tokenizer.count_tokens(markdown);
    debug!(
        title,
        total_tokens, max_tokens, overlap_tokens, "chunking document"
    );

    let sections = split_by_headings(markdown);
    let mut pieces = Vec::new();
    for section in &sections {
        let section_text = format!("{}\n{}", section.heading, section.body);
        split_recursive(
            tokenizer,
            section_text.trim(),
            max_tokens,
            overlap_tokens,
            &DEFAULT_SEPARATORS,
            &mut pieces,
        );
    }

    let chunks = assemble(title, source, pieces);
    debug!(title, chunk_count = chunks.len(), "chunking complete");
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_a_multi_section_document() {
        let tokenizer = Tokenizer::new();
        let markdown = "# Intro\nshort intro body\n\n# Details\nmany details follow here\n";
        let chunks = chunk_markdown(
            &tokenizer,
            markdown,
            "Handbook",
            "https://example.com/handbook",
            500,
            50,
        );
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.starts_with("# Intro"));
        assert!(chunks[1].content.starts_with("# Details"));
        assert_eq!(chunks[0].id, "Handbook-0");
        assert_eq!(chunks[1].id, "Handbook-1");
    }

    #[test]
    fn indices_are_contiguous_across_sections() {
        let tokenizer = Tokenizer::new();
        let mut markdown = String::new();
        for section in 0..4 {
            markdown.push_str(&format!("# Section {section}\n"));
            for line in 0..20 {
                markdown.push_str(&format!("line {line} of section {section}\n"));
            }
        }
        let chunks = chunk_markdown(&tokenizer, &markdown, "Doc", "src", 40, 8);
        assert!(chunks.len() > 4);
        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, expected);
            assert_eq!(chunk.metadata.total_chunks, chunks.len());
        }
    }

    #[test]
    fn empty_document_produces_no_chunks() {
        let tokenizer = Tokenizer::new();
        assert!(chunk_markdown(&tokenizer, "", "Doc", "src", 100, 10).is_empty());
    }
}
