//! Input types produced by an external extraction component.
//!
//! A [`Document`] is the pipeline's immutable input: extracted text plus the
//! metadata the extractor chose to attach. [`Section`]s are optional hints
//! (heading + body) that the chunker uses to keep analysis units aligned with
//! the document's own structure. How the text and sections were extracted
//! (HTML parsing, readability heuristics, OCR) is out of scope here.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// An extracted document ready for analysis.
///
/// Immutable once built; the pipeline never mutates its input.
///
/// # Examples
///
/// ```rust
/// use textweave::document::Document;
///
/// let doc = Document::builder()
///     .title("Quarterly report")
///     .text("Revenue grew. Costs shrank.")
///     .language("en")
///     .build();
///
/// assert_eq!(doc.title, "Quarterly report");
/// assert!(doc.url.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Source address, when the document came from the web.
    pub url: Option<Url>,
    /// Document title as reported by the extractor.
    pub title: String,
    /// Extracted body text. May be raw; the pipeline normalizes it.
    pub text: String,
    /// BCP-47 language tag, when detected.
    pub language: Option<String>,
    /// Sections detected by the extractor, in document order. May be empty;
    /// the chunker falls back to paragraph packing without them.
    pub sections: Vec<Section>,
    /// Extractor-specific metadata passed through untouched.
    pub metadata: FxHashMap<String, serde_json::Value>,
}

impl Document {
    /// Start building a document.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }
}

/// A detected section of a document: a heading and the body under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text, without trailing punctuation or markup.
    pub heading: String,
    /// Body text belonging to this heading.
    pub body: String,
}

impl Section {
    /// Convenience constructor.
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

/// Builder for [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    url: Option<Url>,
    title: String,
    text: String,
    language: Option<String>,
    sections: Vec<Section>,
    metadata: FxHashMap<String, serde_json::Value>,
}

impl DocumentBuilder {
    /// Set the source URL.
    #[must_use]
    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Set the document title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the extracted body text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the detected language tag.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Append one detected section.
    #[must_use]
    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Replace the detected sections.
    #[must_use]
    pub fn sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Finish building.
    pub fn build(self) -> Document {
        Document {
            url: self.url,
            title: self.title,
            text: self.text,
            language: self.language,
            sections: self.sections,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let doc = Document::builder()
            .url(Url::parse("https://example.com/post").unwrap())
            .title("Post")
            .text("body")
            .language("en")
            .metadata("author", serde_json::json!("jo"))
            .build();

        assert_eq!(doc.url.as_ref().unwrap().host_str(), Some("example.com"));
        assert_eq!(doc.metadata["author"], serde_json::json!("jo"));
    }

    #[test]
    fn document_serializes() {
        let doc = Document::builder().title("t").text("x").build();
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title, "t");
        assert_eq!(back.text, "x");
    }
}
