//! Per-chunk outcome types.

use serde::{Deserialize, Serialize};

use crate::providers::{ChunkAnalysis, ProviderError};
use crate::resilience::ResilienceError;

/// Why a chunk failed, reduced to a reportable taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Provider rate-limit responses outlasted every retry.
    RateLimited,
    /// The call (or the whole batch) ran out of time.
    Timeout,
    /// The provider could not be reached.
    Connection,
    /// The response body was unreadable.
    InvalidResponse,
    /// The provider reported a server-side failure.
    Service,
    /// The provider rejected the request itself.
    InvalidRequest,
    /// Every provider's circuit was open.
    CircuitOpen,
}

impl From<&ProviderError> for ErrorKind {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { .. } => Self::RateLimited,
            ProviderError::Timeout { .. } => Self::Timeout,
            ProviderError::Connection(_) => Self::Connection,
            ProviderError::InvalidResponse(_) => Self::InvalidResponse,
            ProviderError::Service { .. } => Self::Service,
            ProviderError::InvalidRequest(_) => Self::InvalidRequest,
        }
    }
}

impl From<&ResilienceError<ProviderError>> for ErrorKind {
    fn from(err: &ResilienceError<ProviderError>) -> Self {
        match err {
            ResilienceError::CircuitOpen { .. } => Self::CircuitOpen,
            ResilienceError::Exhausted { source, .. } | ResilienceError::Inner(source) => {
                Self::from(source)
            }
        }
    }
}

/// Terminal result for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkResult {
    /// The chunk was analyzed.
    Success(ChunkAnalysis),
    /// Every avenue for this chunk failed.
    Failed(ErrorKind),
}

/// One outcome per submitted chunk, keyed by the chunk's original index so
/// aggregation is reproducible regardless of completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// Index of the chunk this outcome belongs to.
    pub chunk_index: usize,
    /// Success or failure.
    pub result: ChunkResult,
}

impl ChunkOutcome {
    /// A successful outcome.
    pub fn success(chunk_index: usize, analysis: ChunkAnalysis) -> Self {
        Self {
            chunk_index,
            result: ChunkResult::Success(analysis),
        }
    }

    /// A failed outcome.
    pub fn failed(chunk_index: usize, kind: ErrorKind) -> Self {
        Self {
            chunk_index,
            result: ChunkResult::Failed(kind),
        }
    }

    /// True when the chunk was analyzed.
    pub fn is_success(&self) -> bool {
        matches!(self.result, ChunkResult::Success(_))
    }

    /// The analysis, when this outcome is a success.
    pub fn analysis(&self) -> Option<&ChunkAnalysis> {
        match &self.result {
            ChunkResult::Success(analysis) => Some(analysis),
            ChunkResult::Failed(_) => None,
        }
    }
}
