//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use textweave::chunker::TextChunk;
use textweave::providers::{
    AnalysisMetadata, ChunkAnalysis, PromptContext, ProviderClient, ProviderError, Sentiment,
    SentimentLabel,
};

/// A minimal successful analysis for scripting providers.
pub fn analysis(summary: &str) -> ChunkAnalysis {
    ChunkAnalysis {
        summary: summary.to_string(),
        key_points: vec![format!("{summary} key point")],
        topics: vec![summary.to_string()],
        sentiment: Sentiment {
            label: SentimentLabel::Neutral,
            score: 0.5,
        },
        metadata: AnalysisMetadata {
            word_count: 100,
            reading_time_minutes: 0.5,
            extra: Default::default(),
        },
    }
}

pub fn positive_analysis(summary: &str) -> ChunkAnalysis {
    ChunkAnalysis {
        sentiment: Sentiment {
            label: SentimentLabel::Positive,
            score: 0.9,
        },
        ..analysis(summary)
    }
}

type Behavior = dyn Fn(&TextChunk) -> Result<ChunkAnalysis, ProviderError> + Send + Sync;

/// A provider whose behavior is a function of the chunk, with call counting.
pub struct ScriptedProvider {
    name: String,
    calls: AtomicUsize,
    behavior: Box<Behavior>,
}

impl ScriptedProvider {
    pub fn new(
        name: impl Into<String>,
        behavior: impl Fn(&TextChunk) -> Result<ChunkAnalysis, ProviderError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
            behavior: Box::new(behavior),
        })
    }

    /// A provider that always succeeds, summarizing with its own name.
    pub fn healthy(name: &str) -> Arc<Self> {
        let summary = format!("{name} summary");
        Self::new(name, move |chunk| {
            Ok(analysis(&format!("{summary} {}", chunk.index)))
        })
    }

    /// A provider that always fails with a connection error.
    pub fn unreachable(name: &str) -> Arc<Self> {
        Self::new(name, |_| {
            Err(ProviderError::Connection("connection refused".into()))
        })
    }

    /// Number of analyze calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        chunk: &TextChunk,
        _ctx: &PromptContext,
    ) -> Result<ChunkAnalysis, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.behavior)(chunk)
    }
}

/// A chunk for orchestrator-level tests, bypassing the chunker.
pub fn chunk(index: usize, total: usize, text: &str) -> TextChunk {
    TextChunk {
        index,
        total_chunks: total,
        text: text.to_string(),
        section_heading: None,
        is_continuation: false,
    }
}
