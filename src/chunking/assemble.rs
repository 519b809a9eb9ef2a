//! Re-indexing of raw text pieces into ordered, uniquely identified chunks.

use serde::{Deserialize, Serialize};

/// Positional metadata attached to every chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub source: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A bounded-size unit of document text, ready for embedding and storage.
///
/// Chunk ids are deterministically derived from the document title and the
/// dense chunk ordinal, so re-running assembly over the same piece list always
/// reproduces the same ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Builds the final chunk records from raw splitter output.
///
/// Pieces that are empty after trimming are dropped; the survivors are
/// re-indexed densely from zero. Pure and idempotent.
pub fn assemble(title: &str, source: &str, pieces: Vec<String>) -> Vec<Chunk> {
    let cleaned: Vec<String> = pieces
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect();
    let total_chunks = cleaned.len();

    cleaned
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk {
            id: format!("{title}-{index}"),
            content,
            metadata: ChunkMetadata {
                title: title.to_string(),
                source: source.to_string(),
                chunk_index: index,
                total_chunks,
            },
        })
        .collect()
}
