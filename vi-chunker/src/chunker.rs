//! Paragraph-respecting text chunker
//!
//! Paragraphs are separated by blank lines. Whole paragraphs are packed into
//! a chunk while it stays within the soft target; a paragraph too long for
//! the target on its own is cut into `hard_max`-sized slices, which may split
//! mid-word. Lengths are counted in characters.

use crate::error::ChunkerError;

pub const DEFAULT_TARGET: usize = 900;
pub const DEFAULT_HARD_MAX: usize = 1200;

/// Separator placed between paragraphs packed into one chunk
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    target: usize,
    hard_max: usize,
}

impl ChunkOptions {
    pub fn new(target: usize, hard_max: usize) -> Result<Self, ChunkerError> {
        if target == 0 {
            return Err(ChunkerError::InvalidOptions(
                "target must be greater than zero".to_string(),
            ));
        }
        if hard_max < target {
            return Err(ChunkerError::InvalidOptions(format!(
                "hard max {hard_max} is below target {target}"
            )));
        }
        Ok(Self { target, hard_max })
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn hard_max(&self) -> usize {
        self.hard_max
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            hard_max: DEFAULT_HARD_MAX,
        }
    }
}

/// Split `text` into ordered, non-empty chunks
pub fn chunkify(text: &str, options: &ChunkOptions) -> Vec<String> {
    let cleaned = text.replace('\0', "");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in paragraphs(&cleaned) {
        let paragraph_len = paragraph.chars().count();
        let joined_len = if current.is_empty() {
            paragraph_len
        } else {
            current_len + PARAGRAPH_SEPARATOR.len() + paragraph_len
        };

        if joined_len <= options.target {
            if !current.is_empty() {
                current.push_str(PARAGRAPH_SEPARATOR);
            }
            current.push_str(paragraph);
            current_len = joined_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if paragraph_len <= options.target {
            current.push_str(paragraph);
            current_len = paragraph_len;
        } else {
            hard_split(paragraph, options.hard_max, &mut chunks);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Trimmed, non-empty paragraphs in order
///
/// A line holding only whitespace ends the paragraph. Line endings inside a
/// paragraph are kept as written (`\n` or `\r\n`).
fn paragraphs(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0usize;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                out.push(text[s..end].trim());
            }
        } else {
            start.get_or_insert(offset);
            end = offset + line.len();
        }
        offset += line.len();
    }
    if let Some(s) = start {
        out.push(text[s..end].trim());
    }

    out.retain(|p| !p.is_empty());
    out
}

fn hard_split(paragraph: &str, hard_max: usize, chunks: &mut Vec<String>) {
    let chars: Vec<char> = paragraph.chars().collect();
    for slice in chars.chunks(hard_max) {
        let piece: String = slice.iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(target: usize, hard_max: usize) -> ChunkOptions {
        ChunkOptions::new(target, hard_max).unwrap()
    }

    #[test]
    fn test_invalid_options_rejected() {
        assert!(ChunkOptions::new(0, 10).is_err());
        assert!(ChunkOptions::new(10, 9).is_err());
        assert!(ChunkOptions::new(10, 10).is_ok());
        assert_eq!(ChunkOptions::default().target(), 900);
        assert_eq!(ChunkOptions::default().hard_max(), 1200);
    }

    #[test]
    fn test_small_paragraphs_pack_together() {
        let chunks = chunkify("alpha\n\nbeta\n\ngamma", &opts(100, 200));
        assert_eq!(chunks, vec!["alpha\n\nbeta\n\ngamma"]);
    }

    #[test]
    fn test_flush_when_target_exceeded() {
        // "aaaa\n\nbbbb" is 10 chars; adding "\n\ncccc" would make 16
        let chunks = chunkify("aaaa\n\nbbbb\n\ncccc", &opts(10, 20));
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn test_paragraph_exactly_target_is_one_chunk() {
        let text = "x".repeat(900);
        let chunks = chunkify(&text, &ChunkOptions::default());
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_paragraph_over_target_is_hard_split() {
        let text = "y".repeat(901);
        let chunks = chunkify(&text, &ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 901);

        let text = "z".repeat(2500);
        let chunks = chunkify(&text, &ChunkOptions::default());
        let lens: Vec<_> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1200, 1200, 100]);
    }

    #[test]
    fn test_long_paragraph_after_pending_chunk_stays_under_hard_max() {
        let text = format!("short\n\n{}", "w".repeat(3000));
        let chunks = chunkify(&text, &opts(900, 1200));
        assert_eq!(chunks[0], "short");
        assert!(chunks.iter().all(|c| c.chars().count() <= 1200));
        assert_eq!(chunks.len(), 1 + 3);
    }

    #[test]
    fn test_blank_lines_with_whitespace_and_crlf() {
        let text = "one\r\n  \t\r\ntwo\n\n\n\nthree\r\nstill three";
        let chunks = chunkify(text, &opts(5, 100));
        assert_eq!(chunks, vec!["one", "two", "three\r\nstill three"]);
    }

    #[test]
    fn test_null_bytes_and_empty_input() {
        assert_eq!(chunkify("a\0b", &opts(10, 10)), vec!["ab"]);
        assert!(chunkify("", &opts(10, 10)).is_empty());
        assert!(chunkify("\n\n  \n\n", &opts(10, 10)).is_empty());
        assert!(chunkify("\0\0", &opts(10, 10)).is_empty());
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // 5 two-byte characters fit a 5-character target
        let chunks = chunkify("ééééé", &opts(5, 5));
        assert_eq!(chunks, vec!["ééééé"]);

        let chunks = chunkify("éééééé", &opts(5, 5));
        assert_eq!(chunks, vec!["ééééé", "é"]);
    }
}
