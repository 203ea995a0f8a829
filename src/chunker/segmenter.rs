//! Lossless text segmentation helpers for the chunker.
//!
//! Every function here returns segments that are exact, contiguous substrings
//! of the input, with separators kept attached to the preceding segment.
//! Concatenating the segments of any split reproduces the input byte for
//! byte; the chunker relies on this to keep chunking reversible.

use unicode_segmentation::UnicodeSegmentation;

/// Paragraph separator in normalized text.
pub(crate) const PARAGRAPH_SEP: &str = "\n\n";

/// Character length (not byte length) of a string slice.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split into paragraph segments, each keeping its trailing separator.
pub(crate) fn paragraph_segments(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(PARAGRAPH_SEP)
}

/// Split into sentence segments on Unicode sentence boundaries.
///
/// Trailing whitespace after a sentence stays attached to that sentence, so
/// the segments cover the input exactly.
pub(crate) fn sentence_segments(text: &str) -> impl Iterator<Item = &str> {
    text.split_sentence_bounds()
}

/// Collapse whitespace into the canonical form the chunker expects.
///
/// Runs of blank lines become a single paragraph break, all other whitespace
/// runs collapse to one space, and control characters other than newlines are
/// stripped. The result is what `Document::text` should look like before
/// chunking; [`ContentChunker::chunk`](super::ContentChunker::chunk) assumes
/// its input is already in this form.
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    let mut paragraphs: Vec<String> = Vec::new();
    for raw_para in cleaned.split("\n\n") {
        let collapsed = raw_para.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            paragraphs.push(collapsed);
        }
    }
    paragraphs.join(PARAGRAPH_SEP)
}
