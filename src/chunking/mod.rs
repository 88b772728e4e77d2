//! Text chunking for the retrieval index.
//!
//! Transcripts are split with a recursive character splitter: text is cut at the
//! coarsest separator that yields pieces under the size limit (paragraphs, then lines,
//! sentences, words, and finally characters), and the pieces are merged back into
//! windows that overlap by up to `overlap` characters.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// A chunk of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    /// Position of this chunk in the source text.
    pub order: usize,
}

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Split text into overlapping chunks of at most `chunk_size` characters.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(size.saturating_sub(1));

    let pieces = split_recursive(text, SEPARATORS, size);
    merge_pieces(pieces, size, overlap)
        .into_iter()
        .enumerate()
        .map(|(order, content)| TextChunk { content, order })
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Break text into pieces of at most `size` characters, keeping separators attached.
fn split_recursive(text: &str, separators: &[&str], size: usize) -> Vec<String> {
    if char_len(text) <= size {
        return vec![text.to_string()];
    }

    let (separator, rest) = match separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
    {
        Some(i) => (separators[i], &separators[i + 1..]),
        None => ("", &[][..]),
    };

    if separator.is_empty() {
        let chars: Vec<char> = text.chars().collect();
        return chars.chunks(size).map(|c| c.iter().collect()).collect();
    }

    let mut pieces = Vec::new();
    for part in text.split_inclusive(separator) {
        if char_len(part) <= size {
            pieces.push(part.to_string());
        } else {
            pieces.extend(split_recursive(part, rest, size));
        }
    }
    pieces
}

/// Greedily pack pieces into windows, carrying a tail of up to `overlap` characters
/// into the next window.
fn merge_pieces(pieces: Vec<String>, size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(String, usize)> = VecDeque::new();
    let mut window_len = 0;

    for piece in pieces {
        let len = char_len(&piece);

        if window_len + len > size && !window.is_empty() {
            emit(&mut chunks, &window);

            while window_len > overlap || (window_len + len > size && window_len > 0) {
                match window.pop_front() {
                    Some((_, removed)) => window_len -= removed,
                    None => break,
                }
            }
        }

        window_len += len;
        window.push_back((piece, len));
    }

    if !window.is_empty() {
        emit(&mut chunks, &window);
    }

    chunks
}

fn emit(chunks: &mut Vec<String>, window: &VecDeque<(String, usize)>) {
    let text: String = window.iter().map(|(piece, _)| piece.as_str()).collect();
    let text = text.trim();
    if !text.is_empty() {
        chunks.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("Hello there. How are you?", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello there. How are you?");
        assert_eq!(chunks[0].order, 0);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", &ChunkingConfig::default()).is_empty());
        assert!(split_text("   \n\n ", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text: String = (0..500).map(|i| format!("w{} ", i)).collect();
        let chunks = split_text(&text, &config(100, 20));

        assert!(chunks.len() > 5);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 100, "{}", chunk.content);
        }

        for pair in chunks.windows(2) {
            let first_word = pair[1].content.split(' ').next().unwrap();
            assert!(
                pair[0].content.ends_with(first_word) || pair[0].content.contains(&format!("{} ", first_word)),
                "chunk {} does not overlap its predecessor",
                pair[1].order
            );
        }

        assert!(chunks.last().unwrap().content.ends_with("w499"));
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para_a = "a".repeat(40);
        let para_b = "b".repeat(40);
        let text = format!("{}\n\n{}", para_a, para_b);

        let chunks = split_text(&text, &config(50, 0));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, para_a);
        assert_eq!(chunks[1].content, para_b);
    }

    #[test]
    fn test_unbroken_text_is_hard_split() {
        let text = "x".repeat(250);
        let chunks = split_text(&text, &config(100, 0));

        let lengths: Vec<usize> = chunks.iter().map(|c| c.content.len()).collect();
        assert_eq!(lengths, vec![100, 100, 50]);
    }
}
