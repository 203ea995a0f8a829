//! Concurrent chunk fan-out with provider fallback.
//!
//! # Execution model
//!
//! 1. Chunks are submitted concurrently, bounded by a worker pool of
//!    `min(worker_limit, chunks.len())` permits.
//! 2. Each chunk tries the configured providers in order, every provider
//!    behind its own resilience stack. An open circuit or exhausted retries
//!    falls through to the next provider; a permanent rejection fails the
//!    chunk immediately — a request the primary rejected as invalid will be
//!    rejected everywhere.
//! 3. A chunk that exhausts all providers is recorded as a failed outcome.
//!    Sibling chunks are never aborted.
//! 4. An optional overall deadline bounds the batch: on expiry, in-flight
//!    calls are dropped and every unresolved chunk is marked
//!    `Failed(Timeout)`. The batch call never blocks past the deadline.
//!
//! Outcomes are keyed by chunk index, so completion order is irrelevant to
//! downstream aggregation.

mod outcome;

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::cache::AnalysisCache;
use crate::chunker::TextChunk;
use crate::providers::{PromptContext, ProviderClient};
use crate::resilience::{ResilienceConfig, ResilienceError, ResilienceStack};

pub use outcome::{ChunkOutcome, ChunkResult, ErrorKind};

/// Default worker-pool bound.
pub const DEFAULT_WORKER_LIMIT: usize = 8;

/// Errors constructing an orchestrator.
#[derive(Debug, Error, Diagnostic)]
pub enum OrchestratorError {
    /// At least one provider is required.
    #[error("orchestrator has no providers")]
    #[diagnostic(
        code(textweave::orchestrator::no_providers),
        help("Register a primary provider before building the orchestrator.")
    )]
    NoProviders,
}

/// One provider plus its private resilience stack.
struct ProviderHandle {
    client: Arc<dyn ProviderClient>,
    stack: ResilienceStack,
}

/// Fans chunks out to providers and collects indexed outcomes.
///
/// Created via [`AnalysisOrchestrator::builder`]. Providers are tried in
/// registration order: primary first, then fallbacks.
pub struct AnalysisOrchestrator {
    providers: Vec<ProviderHandle>,
    worker_limit: usize,
    deadline: Option<Duration>,
    cache: Option<AnalysisCache>,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("providers", &self.providers.len())
            .field("worker_limit", &self.worker_limit)
            .field("deadline", &self.deadline)
            .field("cache", &self.cache)
            .finish()
    }
}

impl AnalysisOrchestrator {
    /// Start building an orchestrator.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Analyze every chunk, returning one outcome per chunk in chunk order.
    #[tracing::instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn analyze_chunks(
        &self,
        chunks: &[TextChunk],
        ctx: &PromptContext,
    ) -> Vec<ChunkOutcome> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let limit = self.worker_limit.min(chunks.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(limit));

        let mut tasks = FuturesUnordered::new();
        for chunk in chunks {
            let semaphore = Arc::clone(&semaphore);
            tasks.push(async move {
                // The semaphore is never closed, so acquisition only fails
                // if the batch future is dropped first.
                let _permit = semaphore.acquire().await;
                self.analyze_one(chunk, ctx).await
            });
        }

        let mut resolved: FxHashMap<usize, ChunkOutcome> = FxHashMap::default();
        let collect = async {
            while let Some(outcome) = tasks.next().await {
                resolved.insert(outcome.chunk_index, outcome);
            }
        };

        match self.deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, collect).await.is_err() {
                    tracing::warn!(
                        ?deadline,
                        "batch deadline elapsed; marking unresolved chunks as timed out"
                    );
                }
            }
            None => collect.await,
        }

        chunks
            .iter()
            .map(|chunk| {
                resolved
                    .remove(&chunk.index)
                    .unwrap_or_else(|| ChunkOutcome::failed(chunk.index, ErrorKind::Timeout))
            })
            .collect()
    }

    /// Run one chunk through cache, then the provider chain.
    async fn analyze_one(&self, chunk: &TextChunk, ctx: &PromptContext) -> ChunkOutcome {
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&chunk.text)
        {
            tracing::debug!(chunk = chunk.index, "analysis cache hit");
            return ChunkOutcome::success(chunk.index, hit);
        }

        let mut last_kind = ErrorKind::CircuitOpen;
        for handle in &self.providers {
            let result = handle
                .stack
                .execute(|| handle.client.analyze(chunk, ctx))
                .await;

            match result {
                Ok(analysis) => {
                    if let Some(cache) = &self.cache {
                        cache.insert(&chunk.text, analysis.clone());
                    }
                    return ChunkOutcome::success(chunk.index, analysis);
                }
                Err(err @ ResilienceError::Inner(_)) => {
                    // Permanent rejection: no point burning fallbacks.
                    tracing::warn!(
                        chunk = chunk.index,
                        provider = handle.client.name(),
                        error = %err,
                        "permanent provider failure"
                    );
                    return ChunkOutcome::failed(chunk.index, ErrorKind::from(&err));
                }
                Err(err) => {
                    tracing::warn!(
                        chunk = chunk.index,
                        provider = handle.client.name(),
                        error = %err,
                        "provider unavailable, trying next"
                    );
                    last_kind = ErrorKind::from(&err);
                }
            }
        }

        ChunkOutcome::failed(chunk.index, last_kind)
    }
}

/// Builder for [`AnalysisOrchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    providers: Vec<ProviderHandle>,
    worker_limit: Option<usize>,
    deadline: Option<Duration>,
    cache: Option<AnalysisCache>,
}

impl OrchestratorBuilder {
    /// Register a provider with its resilience configuration. Registration
    /// order is fallback order.
    #[must_use]
    pub fn provider(mut self, client: Arc<dyn ProviderClient>, resilience: ResilienceConfig) -> Self {
        self.providers.push(ProviderHandle {
            client,
            stack: resilience.build(),
        });
        self
    }

    /// Register a provider with an explicitly assembled stack.
    #[must_use]
    pub fn provider_with_stack(
        mut self,
        client: Arc<dyn ProviderClient>,
        stack: ResilienceStack,
    ) -> Self {
        self.providers.push(ProviderHandle { client, stack });
        self
    }

    /// Bound on concurrently analyzed chunks (default
    /// [`DEFAULT_WORKER_LIMIT`]).
    #[must_use]
    pub fn worker_limit(mut self, limit: usize) -> Self {
        self.worker_limit = Some(limit);
        self
    }

    /// Overall deadline for one batch of chunks.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach an analysis cache.
    #[must_use]
    pub fn cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NoProviders`] when no provider was
    /// registered.
    pub fn build(self) -> Result<AnalysisOrchestrator, OrchestratorError> {
        if self.providers.is_empty() {
            return Err(OrchestratorError::NoProviders);
        }
        Ok(AnalysisOrchestrator {
            providers: self.providers,
            worker_limit: self.worker_limit.unwrap_or(DEFAULT_WORKER_LIMIT),
            deadline: self.deadline,
            cache: self.cache,
        })
    }
}
