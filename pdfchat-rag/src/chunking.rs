//! Text chunking.
//!
//! [`TextChunker`] splits normalized text into overlapping chunks of at most
//! `chunk_size` characters. Each chunk ends at the best natural boundary found
//! near its size limit (paragraph, then sentence, then line, then word) and
//! falls back to a hard character cut. The next chunk always starts exactly
//! `chunk_overlap` characters before the previous chunk ended, so dropping the
//! first `chunk_overlap` characters of every chunk after the first and
//! concatenating yields the normalized input again.
//!
//! All lengths are counted in `char`s, never bytes.

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Splits text into overlapping, boundary-aware chunks.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::TextChunker;
///
/// let chunker = TextChunker::new(1000, 100)?;
/// let chunks = chunker.split(&extracted_text)?;
/// ```
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Where a chunk may end, in order of preference.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Sentence,
    Line,
    Word,
}

impl Boundary {
    const PREFERENCE: [Boundary; 4] =
        [Boundary::Paragraph, Boundary::Sentence, Boundary::Line, Boundary::Word];

    /// Whether a chunk ending right before `chars[end]` ends on this boundary.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        if end < 2 {
            return false;
        }
        let (prev, last) = (chars[end - 2], chars[end - 1]);
        match self {
            Boundary::Paragraph => prev == '\n' && last == '\n',
            Boundary::Sentence => matches!(prev, '.' | '!' | '?') && matches!(last, ' ' | '\n'),
            Boundary::Line => last == '\n',
            Boundary::Word => last == ' ',
        }
    }
}

impl TextChunker {
    /// Create a new `TextChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Normalize `text` and split it into chunks.
    ///
    /// Text that is not longer than `chunk_size` after normalization yields
    /// exactly one chunk equal to the normalized text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyDocument`] if nothing but whitespace remains
    /// after normalization.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(RagError::EmptyDocument { chars: 0, min_chars: 1 });
        }

        let chars: Vec<char> = normalized.chars().collect();
        if chars.len() <= self.chunk_size {
            return Ok(vec![normalized]);
        }

        let mut chunks = Vec::with_capacity(chars.len() / (self.chunk_size - self.chunk_overlap) + 1);
        let mut start = 0;
        loop {
            let hard_end = start + self.chunk_size;
            if hard_end >= chars.len() {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            // Ending at or before start + overlap would not move the next start forward.
            let end = self.find_break(&chars, start + self.chunk_overlap + 1, hard_end);
            chunks.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }

        Ok(chunks)
    }

    /// Pick the end of the chunk within `[min_end, max_end]`.
    fn find_break(&self, chars: &[char], min_end: usize, max_end: usize) -> usize {
        let window = (self.chunk_size / 4).max(1);
        let lowest = min_end.max(max_end.saturating_sub(window));

        Boundary::PREFERENCE
            .iter()
            .find_map(|boundary| {
                (lowest..=max_end).rev().find(|&end| boundary.ends_at(chars, end))
            })
            .unwrap_or(max_end)
    }
}

/// Split `text` into chunks of at most `chunk_size` characters with `overlap`
/// characters carried over between consecutive chunks.
///
/// Shorthand for [`TextChunker::new`] followed by [`TextChunker::split`].
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    TextChunker::new(chunk_size, overlap)?.split(text)
}

/// Normalize extracted text before chunking.
///
/// Line endings become `\n`, runs of other whitespace collapse to one space,
/// lines are trimmed, blank-line runs collapse to a single paragraph break,
/// and the result is trimmed. The function is idempotent.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.replace("\r\n", "\n").split(['\n', '\r']) {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_none() {
            pending_blank = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        for (i, word) in words.enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(word);
        }
        pending_blank = false;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_keeps_paragraphs() {
        let text = "  Title\t\there \r\n\r\n\r\n\nFirst   line\nsecond line  \n\n";
        assert_eq!(normalize_text(text), "Title here\n\nFirst line\nsecond line");
    }

    #[test]
    fn normalize_treats_crlf_and_lone_cr_as_line_breaks() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_text(" a  b\n\n\n c \r\n d ");
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn short_text_is_a_single_normalized_chunk() {
        let chunks = split("  hello   world  ", 100, 10).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn whitespace_only_text_is_empty_document() {
        let err = split(" \n\t \r\n ", 100, 10).unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument { .. }));
    }

    #[test]
    fn rejects_invalid_overlap() {
        assert!(matches!(TextChunker::new(10, 10), Err(RagError::ConfigError(_))));
        assert!(matches!(TextChunker::new(0, 0), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn hard_cuts_advance_by_size_minus_overlap() {
        let text = "x".repeat(25);
        let chunks = split(&text, 10, 3).unwrap();
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        // Starts at 0, 7, 14, 21.
        assert_eq!(lengths, vec![10, 10, 10, 4]);
    }

    #[test]
    fn prefers_sentence_end_over_word_boundary() {
        let text = "One two three. Four five six seven eight nine ten";
        let chunks = split(text, 20, 0).unwrap();
        assert_eq!(chunks[0], "One two three. ");
    }

    #[test]
    fn prefers_paragraph_break_over_sentence_end() {
        let text = "Alpha beta.\n\nGamma. Delta epsilon zeta eta theta";
        let chunks = split(text, 16, 0).unwrap();
        assert_eq!(chunks[0], "Alpha beta.\n\n");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(30);
        let chunks = split(&text, 10, 2).unwrap();
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn falls_back_to_hard_cut_without_boundary_near_the_limit() {
        let text = format!("ab {}", "c".repeat(30));
        let chunks = split(&text, 10, 5).unwrap();
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(&chunks[1][..5], &chunks[0][5..]);
    }
}
