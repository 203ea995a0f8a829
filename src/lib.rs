//! ```text
//! Document ──► chunker::ContentChunker ──► [TextChunk]
//!                                             │
//!                                             ▼
//!               orchestrator::AnalysisOrchestrator
//!                 │  per chunk, bounded worker pool
//!                 ├─► resilience stack ──► providers::ProviderClient (primary)
//!                 ├─► resilience stack ──► providers::ProviderClient (fallbacks…)
//!                 └─► cache::AnalysisCache (optional, consulted first)
//!                                             │
//!                                             ▼
//!                                       [ChunkOutcome]
//!                                             │
//!                                             ▼
//!               aggregate::ResultAggregator ──► ContentAnalysis
//! ```
//!
//! # textweave
//!
//! **Resilient content-analysis pipeline.**
//!
//! `textweave` takes extracted document text, splits it into bounded,
//! section-aware analysis units, submits those units concurrently to one or
//! more external language-understanding providers, tolerates partial and
//! transient failures without losing already-computed work, and
//! deterministically merges per-unit results into one coherent
//! [`ContentAnalysis`](aggregate::ContentAnalysis).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use textweave::prelude::*;
//!
//! let config = ConfigBuilder::new()
//!     .with_file("textweave.toml")?
//!     .with_env()
//!     .build()?;
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .provider(HttpProviderClient::from_config(&provider_cfg)?)
//!     .build()?;
//!
//! let document = Document::builder()
//!     .title("Release notes")
//!     .text(extracted_text)
//!     .build();
//!
//! let analysis = pipeline.analyze(&document).await?;
//! if analysis.partial {
//!     eprintln!("degraded result, failed chunks: {:?}", analysis.failed_chunks);
//! }
//! ```
//!
//! ## Failure model
//!
//! Failures are contained at chunk granularity: a chunk that exhausts every
//! provider is recorded as a failed outcome and never aborts sibling chunks.
//! The aggregate of fewer-than-all chunks is a *partial result* — a valid
//! [`ContentAnalysis`](aggregate::ContentAnalysis) with `partial = true` and
//! the failed indices listed — not an error. Nothing in this crate panics on
//! a failure path.
//!
//! ## Modules
//!
//! - [`document`] – Input types produced by an external extractor
//! - [`chunker`] – Bounded, section-aware chunking
//! - [`resilience`] – Rate limiter, circuit breaker, retry policy
//! - [`providers`] – Provider seam, typed errors, tagged response parsing
//! - [`orchestrator`] – Concurrent fan-out with provider fallback
//! - [`cache`] – Owned TTL cache for per-chunk analyses
//! - [`aggregate`] – Deterministic merge into the final analysis
//! - [`pipeline`] – `analyze(document)` façade wiring the above
//! - [`config`] – Layered configuration (defaults → file → env)
//! - [`telemetry`] – Tracing subscriber setup

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod aggregate;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod document;
pub mod orchestrator;
pub mod pipeline;
pub mod providers;
pub mod resilience;
pub mod telemetry;

/// Re-exports for convenient access to core types.
pub mod prelude {
    pub use crate::aggregate::{AggregatorConfig, ContentAnalysis, ResultAggregator};
    pub use crate::cache::{AnalysisCache, CacheConfig};
    pub use crate::chunker::{ChunkerConfig, ContentChunker, TextChunk, normalize_text};
    pub use crate::config::{ConfigBuilder, PipelineConfig, ProviderConfig};
    pub use crate::document::{Document, Section};
    pub use crate::orchestrator::{AnalysisOrchestrator, ChunkOutcome, ChunkResult, ErrorKind};
    pub use crate::pipeline::{Pipeline, PipelineError};
    pub use crate::providers::{
        ChunkAnalysis, HttpProviderClient, PromptContext, ProviderClient, ProviderError,
        Sentiment, SentimentLabel,
    };
    pub use crate::resilience::{
        CircuitBreaker, Classify, ErrorClass, RateLimiter, ResilienceError, ResilienceStack,
        RetryPolicy,
    };
}
