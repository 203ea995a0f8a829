//! Chunker integration tests: size bound, reversibility, and section-driven
//! packing scenarios.

use proptest::prelude::*;

use textweave::chunker::{ChunkerConfig, ContentChunker, normalize_text};
use textweave::document::Section;

fn chunker(max: usize) -> ContentChunker {
    ContentChunker::new(ChunkerConfig {
        max_chunk_size: max,
    })
}

/// Reconstruct the chunker's input by concatenating chunk texts.
fn reconstruct(chunks: &[textweave::chunker::TextChunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn twelve_thousand_chars_three_sections_three_chunks() {
    // Three ~4 000-character sections against a 4 000 limit: one chunk per
    // section, each carrying its heading.
    let sections = vec![
        Section::new("Introduction", "a".repeat(3998)),
        Section::new("Findings", "b".repeat(3998)),
        Section::new("Conclusion", "c".repeat(3998)),
    ];
    let text: String = sections
        .iter()
        .map(|s| s.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    assert_eq!(text.chars().count(), 11998);

    let chunks = chunker(4000).chunk(&text, &sections).unwrap();

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].section_heading.as_deref(), Some("Introduction"));
    assert_eq!(chunks[1].section_heading.as_deref(), Some("Findings"));
    assert_eq!(chunks[2].section_heading.as_deref(), Some("Conclusion"));
    for chunk in &chunks {
        assert!(chunk.text.chars().count() <= 4000);
        assert_eq!(chunk.total_chunks, 3);
        assert!(!chunk.is_continuation);
    }
    assert_eq!(reconstruct(&chunks), text);
}

#[test]
fn indices_are_dense_and_ordered() {
    let text = (0..50)
        .map(|i| format!("Paragraph number {i} with some filler words."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let chunks = chunker(200).chunk(&text, &[]).unwrap();

    assert!(chunks.len() > 1);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert_eq!(chunk.total_chunks, chunks.len());
    }
}

#[test]
fn normalized_input_is_reconstructed() {
    let raw = "First   paragraph with  spaces.\n\n\nSecond\nparagraph here.\n\nThird.";
    let normalized = normalize_text(raw);
    let chunks = chunker(30).chunk(&normalized, &[]).unwrap();
    assert_eq!(reconstruct(&chunks), normalized);
}

proptest! {
    /// Every chunk respects the bound unless it is a single oversized
    /// sentence (no internal sentence break to split on).
    #[test]
    fn prop_chunk_size_bound(
        paragraphs in proptest::collection::vec("[a-z ]{1,120}\\.", 1..12),
        max in 20usize..200,
    ) {
        let text = paragraphs.join("\n\n");
        let chunks = chunker(max).chunk(&text, &[]).unwrap();
        for chunk in &chunks {
            let len = chunk.text.chars().count();
            if len > max {
                // The exception: exactly one unsplittable sentence.
                let sentences = unicode_sentence_count(&chunk.text)
                    .iter()
                    .filter(|s| !s.trim().is_empty())
                    .count();
                prop_assert_eq!(sentences, 1, "oversized chunk with multiple sentences");
            }
        }
    }

    /// Concatenating chunk texts reconstructs the input exactly.
    #[test]
    fn prop_chunking_is_reversible(
        paragraphs in proptest::collection::vec("[A-Za-z ,]{0,90}\\.", 1..15),
        max in 10usize..300,
    ) {
        let text = paragraphs.join("\n\n");
        let chunks = chunker(max).chunk(&text, &[]).unwrap();
        prop_assert_eq!(reconstruct(&chunks), text);
    }

    /// The section path is reversible over the joined section bodies.
    #[test]
    fn prop_section_chunking_is_reversible(
        bodies in proptest::collection::vec("[a-z ]{1,150}", 1..8),
        max in 20usize..120,
    ) {
        let sections: Vec<Section> = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| Section::new(format!("H{i}"), body.clone()))
            .collect();
        let joined = bodies.join("\n\n");
        // Force the multi-chunk path.
        let text = "x".repeat(max + 1);
        let chunks = chunker(max).chunk(&text, &sections).unwrap();
        prop_assert_eq!(reconstruct(&chunks), joined);
    }
}

fn unicode_sentence_count(text: &str) -> Vec<&str> {
    use unicode_segmentation::UnicodeSegmentation;
    text.split_sentence_bounds().collect()
}
