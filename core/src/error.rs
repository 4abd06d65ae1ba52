//! Error taxonomy for graph construction and scheduler execution.

use thiserror::Error;
use tracing::error;

use crate::dag::vertex::VertexId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Broad category a [`GraphError`] belongs to, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Graph,
    Lifecycle,
    Execution,
    Configuration,
}

/// The error type surfaced by graph construction and campaign execution.
///
/// Graph-construction variants (`DuplicateVertex`, `VertexNotFound`, ...) are raised
/// synchronously at the call site of the offending mutation. Execution variants
/// (`StateFailed`, `FailedStates`) are raised asynchronously, aggregated by the
/// scheduler and delivered once to the terminal callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("vertex already exists: {0}")]
    DuplicateVertex(VertexId),

    #[error("vertex not found: {0}")]
    VertexNotFound(VertexId),

    #[error("edge already exists: {0} -> {1}")]
    DuplicateEdge(VertexId, VertexId),

    #[error("edge not found: {0} -> {1}")]
    EdgeNotFound(VertexId, VertexId),

    #[error("self-loop is not allowed: {0}")]
    SelfLoop(VertexId),

    #[error("edge endpoint not found: {0}")]
    EndpointNotFound(VertexId),

    #[error("invalid vertex state: {0}")]
    InvalidState(String),

    #[error("graph contains a cycle; no valid topological order exists")]
    CyclicGraph,

    #[error("vertex {0} reported failure")]
    StateFailed(VertexId),

    #[error("{} vertex(es) failed: {}", .0.len(), .0.join(", "))]
    FailedStates(Vec<VertexId>),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GraphError {
    /// Numeric code, grouped by category in the hundreds digit — stable for log correlation.
    pub fn numeric_code(&self) -> u32 {
        match self {
            GraphError::DuplicateVertex(_) => 1001,
            GraphError::VertexNotFound(_) => 1002,
            GraphError::DuplicateEdge(_) => 1003,
            GraphError::EdgeNotFound(_) => 1004,
            GraphError::SelfLoop(_) => 1005,
            GraphError::EndpointNotFound(_) => 1006,
            GraphError::InvalidState(_) => 2001,
            GraphError::CyclicGraph => 2002,
            GraphError::StateFailed(_) => 3001,
            GraphError::FailedStates(_) => 3002,
            GraphError::Configuration(_) => 4001,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GraphError::DuplicateVertex(_)
            | GraphError::VertexNotFound(_)
            | GraphError::DuplicateEdge(_)
            | GraphError::EdgeNotFound(_)
            | GraphError::SelfLoop(_)
            | GraphError::EndpointNotFound(_) => ErrorCategory::Graph,
            GraphError::InvalidState(_) | GraphError::CyclicGraph => ErrorCategory::Lifecycle,
            GraphError::StateFailed(_) | GraphError::FailedStates(_) => ErrorCategory::Execution,
            GraphError::Configuration(_) => ErrorCategory::Configuration,
        }
    }

    /// True for the two execution-time variants the scheduler delivers to a
    /// terminal callback rather than raising synchronously to a caller.
    pub fn is_campaign_error(&self) -> bool {
        matches!(self, GraphError::StateFailed(_) | GraphError::FailedStates(_))
    }

    /// Log this error at a severity matching its category.
    pub fn log(&self) {
        let code = self.numeric_code();
        match self.category() {
            ErrorCategory::Execution => {
                error!(error_code = code, category = "execution", "{}", self);
            }
            _ => {
                error!(error_code = code, category = ?self.category(), "{}", self);
            }
        }
    }
}
