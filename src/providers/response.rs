//! Tagged parsing of provider response bodies.
//!
//! Providers answer with either structured JSON or free text. Rather than
//! shape-sniffing at use sites, the body is converted once into a
//! [`ProviderResponse`] and from there deterministically into a
//! [`ChunkAnalysis`]: unstructured text becomes the summary with neutral
//! sentiment and no topics.

use serde::Deserialize;

use super::{AnalysisMetadata, ChunkAnalysis, Sentiment, SentimentLabel};

/// A provider response body, tagged by shape.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// The body parsed as a structured analysis.
    Structured(ChunkAnalysis),
    /// The body was free text (or JSON of the wrong shape).
    Unstructured(String),
}

/// Wire shape accepted from structured providers. Field names are tolerant
/// of common casing variants; everything except the summary is optional.
#[derive(Debug, Deserialize)]
struct WireAnalysis {
    summary: String,
    #[serde(default, alias = "keyPoints")]
    key_points: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    sentiment: Option<WireSentiment>,
    #[serde(default, alias = "wordCount")]
    word_count: Option<u64>,
    #[serde(default, alias = "readingTimeMinutes")]
    reading_time_minutes: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireSentiment {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    score: Option<f32>,
}

fn parse_label(label: &str) -> Option<SentimentLabel> {
    match label.trim().to_ascii_lowercase().as_str() {
        "positive" => Some(SentimentLabel::Positive),
        "neutral" | "mixed" => Some(SentimentLabel::Neutral),
        "negative" => Some(SentimentLabel::Negative),
        _ => None,
    }
}

impl ProviderResponse {
    /// Parse a response body.
    ///
    /// Tries the structured shape first; any JSON error (or a JSON value of
    /// the wrong shape) degrades to [`Unstructured`](Self::Unstructured).
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<WireAnalysis>(body) {
            Ok(wire) => Self::Structured(wire.into()),
            Err(_) => Self::Unstructured(body.trim().to_string()),
        }
    }

    /// Convert into a [`ChunkAnalysis`].
    ///
    /// Unstructured bodies become `{summary: raw_text, topics: [], sentiment:
    /// neutral}` — degraded, never an error.
    pub fn into_analysis(self) -> ChunkAnalysis {
        match self {
            Self::Structured(analysis) => analysis,
            Self::Unstructured(raw) => ChunkAnalysis {
                summary: raw,
                key_points: Vec::new(),
                topics: Vec::new(),
                sentiment: Sentiment::neutral(),
                metadata: AnalysisMetadata::default(),
            },
        }
    }

    /// True when the body parsed as structured output.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

impl From<WireAnalysis> for ChunkAnalysis {
    fn from(wire: WireAnalysis) -> Self {
        let sentiment = wire
            .sentiment
            .and_then(|s| {
                let label = parse_label(s.label.as_deref()?)?;
                Some(Sentiment {
                    label,
                    score: s.score.unwrap_or(0.5).clamp(0.0, 1.0),
                })
            })
            .unwrap_or_else(Sentiment::neutral);

        Self {
            summary: wire.summary,
            key_points: wire.key_points,
            topics: wire.topics,
            sentiment,
            metadata: AnalysisMetadata {
                word_count: wire.word_count.unwrap_or(0),
                reading_time_minutes: wire.reading_time_minutes.unwrap_or(0.0),
                extra: Default::default(),
            },
        }
    }
}
