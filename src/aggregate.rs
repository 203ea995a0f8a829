//! Deterministic aggregation of per-chunk outcomes.
//!
//! Aggregation is a pure function of its input: outcomes are re-sorted by
//! chunk index before merging, so completion order never leaks into the
//! result, and identical input always yields identical output.
//!
//! A batch with no successful outcomes aggregates to a structurally valid,
//! fully degraded [`ContentAnalysis`] — not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orchestrator::ChunkOutcome;
use crate::providers::{AnalysisMetadata, ChunkAnalysis, Sentiment, SentimentLabel};

/// Tunable aggregation bounds.
///
/// The caps default to product guidance but are deliberately configurable
/// rather than baked in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Maximum summary length in characters before truncation.
    pub summary_limit: usize,
    /// Maximum number of distinct topics kept.
    pub topic_cap: usize,
    /// Maximum number of key points kept.
    pub key_point_cap: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            summary_limit: 2000,
            topic_cap: 10,
            key_point_cap: 8,
        }
    }
}

/// The pipeline's final output: one coherent analysis of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// Merged summary across successful chunks.
    pub summary: String,
    /// Key points in chunk order, capped.
    pub key_points: Vec<String>,
    /// Distinct topics in first-seen order, capped.
    pub topics: Vec<String>,
    /// Majority sentiment with mean score.
    pub sentiment: Sentiment,
    /// Summed numeric metrics.
    pub metadata: AnalysisMetadata,
    /// True when at least one chunk failed.
    pub partial: bool,
    /// Original indices of failed chunks, ascending.
    pub failed_chunks: Vec<usize>,
    /// Pipeline run identifier, stamped by the pipeline façade.
    pub run_id: Option<Uuid>,
    /// Completion timestamp, stamped by the pipeline façade.
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Merges per-chunk outcomes into one [`ContentAnalysis`].
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    config: AggregatorConfig,
}

impl ResultAggregator {
    /// Create an aggregator with the given bounds.
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Merge outcomes deterministically.
    pub fn aggregate(&self, outcomes: &[ChunkOutcome]) -> ContentAnalysis {
        let mut ordered: Vec<&ChunkOutcome> = outcomes.iter().collect();
        ordered.sort_by_key(|o| o.chunk_index);

        let failed_chunks: Vec<usize> = ordered
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.chunk_index)
            .collect();

        let successes: Vec<_> = ordered.iter().filter_map(|o| o.analysis()).collect();

        let summary = self.merge_summaries(&successes);
        let topics = self.merge_topics(&successes);
        let key_points = self.merge_key_points(&successes);
        let sentiment = merge_sentiment(&successes);
        let metadata = merge_metadata(&successes);

        ContentAnalysis {
            summary,
            key_points,
            topics,
            sentiment,
            metadata,
            partial: !failed_chunks.is_empty(),
            failed_chunks,
            run_id: None,
            analyzed_at: None,
        }
    }

    fn merge_summaries(&self, successes: &[&ChunkAnalysis]) -> String {
        let joined = successes
            .iter()
            .map(|a| a.summary.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if joined.chars().count() > self.config.summary_limit {
            let mut truncated: String = joined.chars().take(self.config.summary_limit).collect();
            truncated.push_str("...");
            truncated
        } else {
            joined
        }
    }

    fn merge_topics(&self, successes: &[&ChunkAnalysis]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut topics = Vec::new();
        for analysis in successes {
            for topic in &analysis.topics {
                if topics.len() >= self.config.topic_cap {
                    return topics;
                }
                if seen.insert(topic.clone()) {
                    topics.push(topic.clone());
                }
            }
        }
        topics
    }

    fn merge_key_points(&self, successes: &[&ChunkAnalysis]) -> Vec<String> {
        successes
            .iter()
            .flat_map(|a| a.key_points.iter().cloned())
            .take(self.config.key_point_cap)
            .collect()
    }
}

fn merge_sentiment(successes: &[&ChunkAnalysis]) -> Sentiment {
    if successes.is_empty() {
        return Sentiment::neutral();
    }

    let mut positive = 0usize;
    let mut neutral = 0usize;
    let mut negative = 0usize;
    let mut score_sum = 0.0f64;
    for analysis in successes {
        match analysis.sentiment.label {
            SentimentLabel::Positive => positive += 1,
            SentimentLabel::Neutral => neutral += 1,
            SentimentLabel::Negative => negative += 1,
        }
        score_sum += f64::from(analysis.sentiment.score);
    }

    // Majority wins; any tie for the top count resolves to Neutral. The
    // tie-break is a policy decision, not an observed provider contract.
    let top = positive.max(neutral).max(negative);
    let label = if positive == top && negative != top && neutral != top {
        SentimentLabel::Positive
    } else if negative == top && positive != top && neutral != top {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    Sentiment {
        label,
        score: (score_sum / successes.len() as f64) as f32,
    }
}

fn merge_metadata(successes: &[&ChunkAnalysis]) -> AnalysisMetadata {
    let mut merged = AnalysisMetadata::default();
    for analysis in successes {
        merged.word_count += analysis.metadata.word_count;
        merged.reading_time_minutes += analysis.metadata.reading_time_minutes;
    }
    merged
}
