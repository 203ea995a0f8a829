//! Provider seam: one external language-understanding service per client.
//!
//! A [`ProviderClient`] analyzes one [`TextChunk`] at a time and returns a
//! parsed [`ChunkAnalysis`] or a typed [`ProviderError`]. Response bodies
//! that are not valid structured output degrade to an unstructured analysis
//! ([`ProviderResponse`]) instead of failing — parse trouble is recoverable,
//! network trouble is not.

mod http;
mod response;

use std::time::Duration;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::chunker::TextChunk;
use crate::resilience::{Classify, ErrorClass};

pub use http::{HttpClientError, HttpProviderClient};
pub use response::ProviderResponse;

// ── Analysis payload ───────────────────────────────────────────────────

/// Sentiment polarity of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    /// Positive tone.
    Positive,
    /// Neutral or mixed tone.
    Neutral,
    /// Negative tone.
    Negative,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// A sentiment label with its confidence score in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Polarity label.
    pub label: SentimentLabel,
    /// Confidence score.
    pub score: f32,
}

impl Sentiment {
    /// The neutral midpoint, used wherever no signal exists.
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.5,
        }
    }
}

/// Numeric metrics attached to an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Number of words analyzed.
    pub word_count: u64,
    /// Estimated reading time, in minutes.
    pub reading_time_minutes: f64,
    /// Provider-specific extras passed through untouched.
    #[serde(default)]
    pub extra: FxHashMap<String, serde_json::Value>,
}

/// The parsed result of analyzing one chunk. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkAnalysis {
    /// Short summary of the chunk.
    pub summary: String,
    /// Salient points, in the order the provider produced them.
    pub key_points: Vec<String>,
    /// Topic labels, in the order the provider produced them.
    pub topics: Vec<String>,
    /// Chunk sentiment.
    pub sentiment: Sentiment,
    /// Numeric metrics and provider extras.
    pub metadata: AnalysisMetadata,
}

// ── Prompt context ─────────────────────────────────────────────────────

/// Document-level context handed to providers alongside each chunk.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Title of the source document.
    pub document_title: String,
    /// Detected document language, when known.
    pub language: Option<String>,
    /// Source URL, when the document came from the web.
    pub url: Option<Url>,
}

// ── Errors ─────────────────────────────────────────────────────────────

/// Typed failure of a single provider call.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    /// The provider asked us to slow down.
    #[error("provider rate-limited the request")]
    #[diagnostic(code(textweave::provider::rate_limited))]
    RateLimited {
        /// Server-suggested wait, when the response carried one.
        retry_after: Option<Duration>,
    },

    /// The call did not complete within the configured timeout.
    #[error("provider call timed out after {elapsed:?}")]
    #[diagnostic(code(textweave::provider::timeout))]
    Timeout {
        /// The configured per-call timeout that elapsed.
        elapsed: Duration,
    },

    /// The provider could not be reached.
    #[error("connection failed: {0}")]
    #[diagnostic(code(textweave::provider::connection))]
    Connection(String),

    /// The response body could not be read at all.
    #[error("unreadable response: {0}")]
    #[diagnostic(code(textweave::provider::invalid_response))]
    InvalidResponse(String),

    /// The provider reported a server-side failure.
    #[error("provider error ({status}): {message}")]
    #[diagnostic(code(textweave::provider::service))]
    Service {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The provider rejected the request itself.
    #[error("request rejected: {0}")]
    #[diagnostic(
        code(textweave::provider::invalid_request),
        help("Check chunk size limits and request format for this provider.")
    )]
    InvalidRequest(String),
}

impl Classify for ProviderError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Connection(_) => {
                ErrorClass::Transient
            }
            Self::Service { status, .. } if *status >= 500 => ErrorClass::Transient,
            Self::Service { .. } | Self::InvalidResponse(_) | Self::InvalidRequest(_) => {
                ErrorClass::Permanent
            }
        }
    }
}

// ── Client trait ───────────────────────────────────────────────────────

/// A single external analysis provider.
///
/// Implementations talk to one service and are shared across all concurrent
/// chunk calls to it; they must be stateless apart from connection pooling.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable provider name, used in logs and fallback ordering.
    fn name(&self) -> &str;

    /// Analyze one chunk.
    async fn analyze(
        &self,
        chunk: &TextChunk,
        ctx: &PromptContext,
    ) -> Result<ChunkAnalysis, ProviderError>;
}

/// Word count and estimated reading time (200 words per minute) for a text.
pub(crate) fn text_metrics(text: &str) -> (u64, f64) {
    let words = text.split_whitespace().count() as u64;
    (words, words as f64 / 200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_and_permanent_classification() {
        assert!(ProviderError::RateLimited { retry_after: None }.is_transient());
        assert!(
            ProviderError::Timeout {
                elapsed: Duration::from_secs(5)
            }
            .is_transient()
        );
        assert!(ProviderError::Connection("refused".into()).is_transient());
        assert!(
            ProviderError::Service {
                status: 503,
                message: "overloaded".into()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::Service {
                status: 422,
                message: "bad".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::InvalidRequest("too long".into()).is_transient());
    }

    #[test]
    fn text_metrics_counts_words() {
        let (words, minutes) = text_metrics("one two three four");
        assert_eq!(words, 4);
        assert!((minutes - 0.02).abs() < f64::EPSILON);
    }
}
