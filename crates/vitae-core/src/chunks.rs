//! Splits the document text into fixed-size overlapping chunks for embedding and retrieval.
//!
//! Pages are joined with a blank line, then a window of `max_chars` characters slides
//! over the whole text, advancing `max_chars - overlap` characters at a time. Lengths
//! and offsets count Unicode scalar values, not bytes.

use serde::{Deserialize, Serialize};

use crate::loader::Segment;

/// Default maximum characters per chunk.
pub const DEFAULT_MAX_CHARS: usize = 1000;

/// Default number of characters shared by consecutive chunks.
pub const DEFAULT_OVERLAP: usize = 100;

/// Inserted between pages when the document text is assembled.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A chunk of the document text, with the pages it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Page the chunk starts on.
    pub page_start: u32,
    /// Page the chunk ends on.
    pub page_end: u32,
    /// Character offset of the first character in the document text.
    pub start: usize,
    /// Character offset one past the last character.
    pub end: usize,
    /// Position of this chunk in the document (0, 1, 2, …).
    pub index: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Window size and overlap. `overlap` is always smaller than `max_chars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    max_chars: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, ChunkError> {
        if max_chars == 0 || overlap >= max_chars {
            return Err(ChunkError::InvalidParams { max_chars, overlap });
        }
        Ok(Self { max_chars, overlap })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.max_chars - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// The full document text: page texts joined by [PAGE_SEPARATOR].
pub fn document_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Chunk all segments. Text shorter than the window yields one chunk; empty text yields none.
pub fn chunk_segments(segments: &[Segment], params: ChunkParams) -> Vec<Chunk> {
    let text = document_text(segments);
    // Byte offset of every char, plus the end of the string, so windows slice on char boundaries.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;
    if total == 0 {
        return Vec::new();
    }
    let page_starts = page_start_offsets(segments);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + params.max_chars).min(total);
        chunks.push(Chunk {
            text: text[bounds[start]..bounds[end]].to_string(),
            page_start: page_at(&page_starts, start),
            page_end: page_at(&page_starts, end - 1),
            start,
            end,
            index: chunks.len(),
        });
        if end == total {
            break;
        }
        start += params.step();
    }
    chunks
}

/// Rebuilds the document text from its chunks by dropping each chunk's overlap with its predecessor.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;
    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start);
        out.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.end);
    }
    out
}

/// (character offset, page) at which each page's text begins.
fn page_start_offsets(segments: &[Segment]) -> Vec<(usize, u32)> {
    let sep = PAGE_SEPARATOR.chars().count();
    let mut offset = 0;
    let mut starts = Vec::with_capacity(segments.len());
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            offset += sep;
        }
        starts.push((offset, seg.page));
        offset += seg.text.chars().count();
    }
    starts
}

/// Page owning character `pos`. Separator characters belong to the page before them.
fn page_at(starts: &[(usize, u32)], pos: usize) -> u32 {
    let i = starts.partition_point(|&(offset, _)| offset <= pos);
    starts[i.saturating_sub(1)].1
}

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({max_chars})")]
    InvalidParams { max_chars: usize, overlap: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(page: u32, text: &str) -> Segment {
        Segment {
            page,
            text: text.to_string(),
        }
    }

    fn params(max: usize, overlap: usize) -> ChunkParams {
        ChunkParams::new(max, overlap).unwrap()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let c = chunk_segments(&[seg(1, "One paragraph.")], ChunkParams::default());
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].text, "One paragraph.");
        assert_eq!((c[0].start, c[0].end), (0, 14));
    }

    #[test]
    fn exactly_max_is_one_chunk() {
        let c = chunk_segments(&[seg(1, &"x".repeat(1000))], ChunkParams::default());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn empty_document_has_no_chunks() {
        assert!(chunk_segments(&[], ChunkParams::default()).is_empty());
        assert!(chunk_segments(&[seg(1, "")], ChunkParams::default()).is_empty());
    }

    #[test]
    fn windows_overlap_exactly() {
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let c = chunk_segments(&[seg(1, &text)], ChunkParams::default());
        // Starts at 0, 900, 1800; the last window runs to the end.
        assert_eq!(c.len(), 3);
        assert_eq!(c.iter().map(|ch| ch.start).collect::<Vec<_>>(), vec![0, 900, 1800]);
        assert_eq!(c[2].end, 2500);
        assert_eq!(c[2].len(), 700);
        for pair in c.windows(2) {
            let tail: String = pair[0].text.chars().skip(900).collect();
            let head: String = pair[1].text.chars().take(100).collect();
            assert_eq!(tail, head);
        }
        assert!(c.iter().all(|ch| ch.len() <= 1000 && ch.text.chars().count() == ch.len()));
    }

    #[test]
    fn trailing_text_is_never_dropped() {
        let text = "z".repeat(1901);
        let c = chunk_segments(&[seg(1, &text)], ChunkParams::default());
        assert_eq!(c.last().unwrap().end, 1901);
        assert_eq!(reconstruct(&c), text);
    }

    #[test]
    fn reconstruct_is_lossless_across_pages() {
        let pages = vec![
            seg(1, &"Jane Doe, engineer. ".repeat(40)),
            seg(2, &"Skills: Rust, SQL, Kubernetes. ".repeat(30)),
        ];
        for (max, overlap) in [(1000, 100), (50, 10), (7, 6), (3, 0)] {
            let c = chunk_segments(&pages, params(max, overlap));
            assert_eq!(reconstruct(&c), document_text(&pages), "max={max} overlap={overlap}");
        }
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "é".repeat(15);
        let c = chunk_segments(&[seg(1, &text)], params(10, 2));
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].text.chars().count(), 10);
        assert_eq!(c[1].start, 8);
        assert_eq!(c[1].text.chars().count(), 7);
    }

    #[test]
    fn chunks_record_page_span() {
        let pages = vec![seg(1, &"a".repeat(600)), seg(2, &"b".repeat(600))];
        let c = chunk_segments(&pages, ChunkParams::default());
        assert_eq!(c.len(), 2);
        assert_eq!((c[0].page_start, c[0].page_end), (1, 2));
        assert_eq!((c[1].page_start, c[1].page_end), (2, 2));
        let c = chunk_segments(&pages, params(300, 0));
        assert_eq!((c[0].page_start, c[0].page_end), (1, 1));
        assert_eq!((c.last().unwrap().page_start, c.last().unwrap().page_end), (2, 2));
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(ChunkParams::new(100, 100).is_err());
        assert!(ChunkParams::new(0, 0).is_err());
        assert!(ChunkParams::new(100, 99).is_ok());
    }
}
