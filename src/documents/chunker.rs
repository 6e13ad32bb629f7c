//! Overlapping text chunking.
//!
//! Splits document text into chunks bounded by a target size, preferring to
//! cut at a paragraph break, then a sentence end, then a word boundary, and
//! only as a last resort at a raw character position. Adjacent chunks share
//! exactly `overlap` characters, so the original text can be reconstructed by
//! concatenating the first chunk with each later chunk minus its leading
//! overlap.

/// Splits text into overlapping chunks of at most `chunk_size` characters.
///
/// Sizes are measured in characters, not bytes, so multi-byte text never
/// produces a cut inside a code point.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker. `chunk_size` must be greater than `overlap`; the
    /// configuration layer validates this before construction.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        debug_assert!(chunk_size > overlap);
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Lazily iterate over the chunks of `text`. The iterator is finite and
    /// can be recreated at any time; empty input yields no chunks.
    pub fn chunks(&self, text: &str) -> Chunks {
        Chunks {
            chars: text.chars().collect(),
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            start: 0,
            done: false,
        }
    }

    /// Split `text` into chunks, collecting the lazy sequence.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunks(text).collect()
    }

    /// Configured maximum chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Configured overlap between adjacent chunks in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Lazy chunk sequence over a text. Created by [`TextChunker::chunks`].
pub struct Chunks {
    chars: Vec<char>,
    chunk_size: usize,
    overlap: usize,
    start: usize,
    done: bool,
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done || self.chars.is_empty() {
            return None;
        }

        if self.chars.len() - self.start <= self.chunk_size {
            self.done = true;
            return Some(self.chars[self.start..].iter().collect());
        }

        // A split must leave more than `overlap` characters of progress,
        // otherwise the next chunk would start at or before this one.
        let min_end = self.start + self.overlap + 1;
        let max_end = self.start + self.chunk_size;
        let end = find_split(&self.chars, min_end, max_end);

        let chunk = self.chars[self.start..end].iter().collect();
        self.start = end - self.overlap;
        Some(chunk)
    }
}

/// Find the best split position in `(min_end..=max_end)`, scanning backwards
/// from the window end at each preference level.
fn find_split(chars: &[char], min_end: usize, max_end: usize) -> usize {
    // Paragraph break: cut just after a blank line.
    for end in (min_end..=max_end).rev() {
        if end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n' {
            return end;
        }
    }

    // Sentence end: cut after ". ", "! ", "? " or a line break.
    for end in (min_end..=max_end).rev() {
        let c = chars[end - 1];
        if c == '\n' {
            return end;
        }
        if c == ' ' && end >= 2 && matches!(chars[end - 2], '.' | '!' | '?') {
            return end;
        }
    }

    // Word boundary.
    for end in (min_end..=max_end).rev() {
        if chars[end - 1] == ' ' {
            return end;
        }
    }

    // Raw character cut.
    max_end
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the original text from chunks by stripping each later chunk's
    /// leading overlap.
    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_empty_input() {
        let chunker = TextChunker::new(100, 10);
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn test_short_input_single_chunk() {
        let chunker = TextChunker::new(100, 10);
        let chunks = chunker.split("short text");
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let chunker = TextChunker::new(80, 15);
        let text = "First paragraph with some sentences. More of it here.\n\n\
                    Second paragraph follows after the break. It keeps going with \
                    words and words and more words until it is long enough.\n\n\
                    Third paragraph closes the document with a final thought.";
        let chunks = chunker.split(text);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks, 15), text);
    }

    #[test]
    fn test_no_chunk_exceeds_bound() {
        let chunker = TextChunker::new(50, 10);
        let text = "word ".repeat(100);
        for chunk in chunker.split(&text) {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn test_adjacent_chunks_share_exact_overlap() {
        let chunker = TextChunker::new(60, 12);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - 12)
                .collect();
            let head: String = pair[1].chars().take(12).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let chunker = TextChunker::new(50, 5);
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(40));
        let chunks = chunker.split(&text);
        // The first chunk should end at the paragraph break, not at the raw
        // 50-character position.
        assert!(chunks[0].ends_with("\n\n"));
    }

    #[test]
    fn test_falls_back_to_raw_cut() {
        let chunker = TextChunker::new(20, 4);
        let text = "x".repeat(100);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].chars().count(), 20);
        assert_eq!(reconstruct(&chunks, 4), text);
    }

    #[test]
    fn test_multibyte_text_is_safe() {
        let chunker = TextChunker::new(30, 6);
        let text = "Das Mädchen über die Straße ging. ".repeat(8);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks, 6), text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
        }
    }

    #[test]
    fn test_sequence_is_lazy_and_restartable() {
        let chunker = TextChunker::new(40, 8);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";

        let mut first = chunker.chunks(text);
        let head = first.next().unwrap();

        // A fresh iterator starts over from the beginning.
        let restarted: Vec<String> = chunker.chunks(text).collect();
        assert_eq!(restarted[0], head);
        assert_eq!(reconstruct(&restarted, 8), text);
    }
}
