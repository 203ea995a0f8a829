//! Pipeline façade: `analyze(document)` end to end.
//!
//! Wires the chunker, orchestrator, and aggregator together from one
//! [`PipelineConfig`]: normalize → chunk → fan out → aggregate. The façade
//! adds nothing algorithmic of its own beyond input validation and run
//! stamping.

use std::sync::Arc;

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::{AggregatorConfig, ContentAnalysis, ResultAggregator};
use crate::cache::AnalysisCache;
use crate::chunker::{ChunkerConfig, ChunkerError, ContentChunker, normalize_text};
use crate::config::{ConfigError, PipelineConfig};
use crate::document::{Document, Section};
use crate::orchestrator::{AnalysisOrchestrator, OrchestratorError};
use crate::providers::{HttpClientError, HttpProviderClient, PromptContext, ProviderClient};
use crate::resilience::ResilienceConfig;

/// Errors from assembling or running the pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    /// The document contained no analyzable text after normalization.
    #[error("document has no analyzable text")]
    #[diagnostic(
        code(textweave::pipeline::empty_document),
        help("Check the upstream extractor; the document text was empty or whitespace.")
    )]
    EmptyDocument,

    /// Chunking failed.
    #[error(transparent)]
    #[diagnostic(code(textweave::pipeline::chunker))]
    Chunker(#[from] ChunkerError),

    /// The orchestrator could not be assembled.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// A configured HTTP provider could not be constructed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] HttpClientError),

    /// Configuration was invalid.
    #[error(transparent)]
    #[diagnostic(code(textweave::pipeline::config))]
    Config(#[from] ConfigError),
}

/// The assembled analysis pipeline.
///
/// # Examples
///
/// ```rust,ignore
/// use textweave::pipeline::Pipeline;
///
/// let pipeline = Pipeline::builder().config(config).build()?;
/// let analysis = pipeline.analyze(&document).await?;
/// ```
#[derive(Debug)]
pub struct Pipeline {
    chunker: ContentChunker,
    orchestrator: AnalysisOrchestrator,
    aggregator: ResultAggregator,
}

impl Pipeline {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Analyze a document end to end.
    ///
    /// Individual chunk failures degrade the result (`partial = true`)
    /// instead of failing the call; the only runtime error is an empty
    /// document.
    #[tracing::instrument(skip_all, fields(title = %document.title))]
    pub async fn analyze(&self, document: &Document) -> Result<ContentAnalysis, PipelineError> {
        let normalized = normalize_text(&document.text);
        if normalized.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        let sections: Vec<Section> = document
            .sections
            .iter()
            .map(|s| Section::new(s.heading.clone(), normalize_text(&s.body)))
            .filter(|s| !s.body.is_empty())
            .collect();

        let chunks = self.chunker.chunk(&normalized, &sections)?;
        tracing::debug!(chunks = chunks.len(), "document chunked");

        let ctx = PromptContext {
            document_title: document.title.clone(),
            language: document.language.clone(),
            url: document.url.clone(),
        };
        let outcomes = self.orchestrator.analyze_chunks(&chunks, &ctx).await;

        let mut analysis = self.aggregator.aggregate(&outcomes);
        analysis.run_id = Some(Uuid::new_v4());
        analysis.analyzed_at = Some(Utc::now());

        if analysis.partial {
            tracing::warn!(
                failed_chunks = ?analysis.failed_chunks,
                "analysis completed degraded"
            );
        } else {
            tracing::info!(chunks = chunks.len(), "analysis completed");
        }
        Ok(analysis)
    }
}

/// Builder for [`Pipeline`].
///
/// Providers declared in the config are constructed as
/// [`HttpProviderClient`]s and registered first (primary, then fallbacks, in
/// config order); clients added with [`provider`](Self::provider) follow as
/// further fallbacks.
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    extra_providers: Vec<(Arc<dyn ProviderClient>, ResilienceConfig)>,
}

impl PipelineBuilder {
    /// Use this configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an already-constructed provider with default resilience.
    #[must_use]
    pub fn provider(self, client: Arc<dyn ProviderClient>) -> Self {
        self.provider_with_resilience(client, ResilienceConfig::default())
    }

    /// Register an already-constructed provider with explicit resilience
    /// tuning.
    #[must_use]
    pub fn provider_with_resilience(
        mut self,
        client: Arc<dyn ProviderClient>,
        resilience: ResilienceConfig,
    ) -> Self {
        self.extra_providers.push((client, resilience));
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Fails when a configured provider cannot be constructed or when no
    /// provider ends up registered at all.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let chunker = ContentChunker::new(ChunkerConfig {
            max_chunk_size: self.config.max_chunk_size,
        });
        let aggregator = ResultAggregator::new(AggregatorConfig {
            summary_limit: self.config.summary_limit,
            topic_cap: self.config.topic_cap,
            key_point_cap: self.config.key_point_cap,
        });

        let mut orchestrator = AnalysisOrchestrator::builder().worker_limit(self.config.worker_limit);
        if let Some(deadline) = self.config.deadline() {
            orchestrator = orchestrator.deadline(deadline);
        }
        if let Some(cache) = self.config.cache {
            orchestrator = orchestrator.cache(AnalysisCache::new(cache.to_cache_config()));
        }
        for provider_config in &self.config.providers {
            let client = HttpProviderClient::from_config(provider_config)?;
            orchestrator = orchestrator.provider(Arc::new(client), provider_config.resilience());
        }
        for (client, resilience) in self.extra_providers {
            orchestrator = orchestrator.provider(client, resilience);
        }

        Ok(Pipeline {
            chunker,
            orchestrator: orchestrator.build()?,
            aggregator,
        })
    }
}
