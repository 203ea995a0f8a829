//! Bounded, section-aware chunking of normalized document text.
//!
//! # Chunking model
//!
//! 1. Text that fits inside `max_chunk_size` becomes a single chunk.
//! 2. With detected sections, whole sections are packed greedily into chunks.
//!    A section whose own body exceeds the limit is split by paragraph, then
//!    by sentence, and its parts are labelled `"{heading} (Part i/n)"`.
//! 3. Without sections, paragraphs are packed greedily, with the same
//!    sentence-level fallback for an oversized paragraph.
//!
//! Sizes are measured in characters. Every returned chunk respects the limit
//! with one documented exception: a single sentence longer than the limit is
//! returned unsplit rather than broken mid-sentence.
//!
//! # Reversibility
//!
//! Part labels live in [`TextChunk::section_heading`], never inside
//! [`TextChunk::text`], and all splits happen on lossless segment boundaries.
//! Concatenating the `text` fields in index order therefore reconstructs the
//! input exactly: the full `text` argument in the sectionless path, or the
//! section bodies joined by blank lines in the section path.

mod segmenter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Section;
use segmenter::{PARAGRAPH_SEP, char_len, paragraph_segments, sentence_segments};

pub use segmenter::normalize_text;

/// A bounded slice of document text submitted as one analysis unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position of this chunk in the document, starting at 0.
    pub index: usize,
    /// Total number of chunks produced for the document.
    pub total_chunks: usize,
    /// Chunk text. Always a verbatim slice of the chunker's input.
    pub text: String,
    /// Heading context, possibly annotated with a `(Part i/n)` label when a
    /// section had to be split.
    pub section_heading: Option<String>,
    /// True when this chunk continues a section or paragraph started by the
    /// previous chunk.
    pub is_continuation: bool,
}

/// Configuration for [`ContentChunker`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size, in characters.
    pub max_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
        }
    }
}

/// Errors from chunking.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// `max_chunk_size` must be at least 1.
    #[error("max_chunk_size must be greater than zero")]
    ZeroMaxChunkSize,
}

/// Splits normalized text into bounded, section-aware [`TextChunk`]s.
///
/// # Examples
///
/// ```rust
/// use textweave::chunker::{ChunkerConfig, ContentChunker};
///
/// let chunker = ContentChunker::new(ChunkerConfig { max_chunk_size: 40 });
/// let chunks = chunker.chunk("short text", &[]).unwrap();
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].total_chunks, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ContentChunker {
    config: ChunkerConfig,
}

/// A packed chunk before index/total annotation.
struct PackedChunk {
    text: String,
    heading: Option<String>,
    continuation: bool,
}

impl ContentChunker {
    /// Create a chunker with the given configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Maximum chunk size, in characters.
    pub fn max_chunk_size(&self) -> usize {
        self.config.max_chunk_size
    }

    /// Split `text` into bounded chunks.
    ///
    /// `sections` are optional extractor hints; when present they drive the
    /// packing and supply heading context. The text inside each returned
    /// chunk is a verbatim slice of the input (see module docs on
    /// reversibility).
    pub fn chunk(&self, text: &str, sections: &[Section]) -> Result<Vec<TextChunk>, ChunkerError> {
        let max = self.config.max_chunk_size;
        if max == 0 {
            return Err(ChunkerError::ZeroMaxChunkSize);
        }

        if char_len(text) <= max {
            let heading = match sections {
                [only] => Some(only.heading.clone()),
                _ => None,
            };
            return Ok(finalize(vec![PackedChunk {
                text: text.to_string(),
                heading,
                continuation: false,
            }]));
        }

        let packed = if sections.is_empty() {
            pack_text(text, max)
                .into_iter()
                .map(|piece| PackedChunk {
                    text: piece.text,
                    heading: None,
                    continuation: piece.starts_mid_unit,
                })
                .collect()
        } else {
            pack_sections(sections, max)
        };

        Ok(finalize(packed))
    }
}

/// Assign `index`/`total_chunks` once packing is complete.
fn finalize(packed: Vec<PackedChunk>) -> Vec<TextChunk> {
    let total = packed.len();
    packed
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| TextChunk {
            index,
            total_chunks: total,
            text: chunk.text,
            section_heading: chunk.heading,
            is_continuation: chunk.continuation,
        })
        .collect()
}

/// Greedily pack whole sections, splitting any section that exceeds `max`.
fn pack_sections(sections: &[Section], max: usize) -> Vec<PackedChunk> {
    fn flush(current: &mut String, heading: &mut Option<String>, out: &mut Vec<PackedChunk>) {
        if !current.is_empty() {
            out.push(PackedChunk {
                text: std::mem::take(current),
                heading: heading.take(),
                continuation: false,
            });
        }
    }

    let mut out: Vec<PackedChunk> = Vec::new();
    let mut current = String::new();
    let mut current_heading: Option<String> = None;

    let last = sections.len().saturating_sub(1);
    for (i, section) in sections.iter().enumerate() {
        // The inter-section separator travels with the preceding body so
        // concatenating chunk texts stays lossless.
        let mut segment = section.body.clone();
        if i != last {
            segment.push_str(PARAGRAPH_SEP);
        }
        let seg_len = char_len(&segment);

        if seg_len > max {
            flush(&mut current, &mut current_heading, &mut out);
            let pieces = pack_text(&segment, max);
            let parts = pieces.len();
            for (part, piece) in pieces.into_iter().enumerate() {
                let heading = if parts > 1 {
                    format!("{} (Part {}/{})", section.heading, part + 1, parts)
                } else {
                    section.heading.clone()
                };
                out.push(PackedChunk {
                    text: piece.text,
                    heading: Some(heading),
                    continuation: part > 0,
                });
            }
            continue;
        }

        if !current.is_empty() && char_len(&current) + seg_len > max {
            flush(&mut current, &mut current_heading, &mut out);
        }
        if current.is_empty() {
            current_heading = Some(section.heading.clone());
        }
        current.push_str(&segment);
    }
    flush(&mut current, &mut current_heading, &mut out);
    out
}

/// A packed piece of sectionless text.
struct PackedPiece {
    text: String,
    /// True when the piece begins mid-paragraph (sentence-level split).
    starts_mid_unit: bool,
}

/// Greedily pack paragraphs, splitting any paragraph that exceeds `max` on
/// sentence boundaries.
fn pack_text(text: &str, max: usize) -> Vec<PackedPiece> {
    let mut out: Vec<PackedPiece> = Vec::new();
    let mut current = String::new();

    for para in paragraph_segments(text) {
        let para_len = char_len(para);

        if para_len > max {
            if !current.is_empty() {
                out.push(PackedPiece {
                    text: std::mem::take(&mut current),
                    starts_mid_unit: false,
                });
            }
            for (i, piece) in pack_sentences(para, max).into_iter().enumerate() {
                out.push(PackedPiece {
                    text: piece,
                    starts_mid_unit: i > 0,
                });
            }
            continue;
        }

        if !current.is_empty() && char_len(&current) + para_len > max {
            out.push(PackedPiece {
                text: std::mem::take(&mut current),
                starts_mid_unit: false,
            });
        }
        current.push_str(para);
    }

    if !current.is_empty() {
        out.push(PackedPiece {
            text: current,
            starts_mid_unit: false,
        });
    }
    out
}

/// Greedily pack sentences. A single sentence longer than `max` is emitted
/// whole; breaking mid-sentence would hand providers an unanalyzable stub.
fn pack_sentences(text: &str, max: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in sentence_segments(text) {
        let len = char_len(sentence);

        if len > max {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(sentence.to_string());
            continue;
        }

        if !current.is_empty() && char_len(&current) + len > max {
            out.push(std::mem::take(&mut current));
        }
        current.push_str(sentence);
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}
