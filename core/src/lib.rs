//! # graph-core
//!
//! A concurrency-capped DAG task scheduler.
//!
//! ## Architecture
//!
//! - **Graph**: adjacency-map storage for vertices and directed edges, plus a
//!   non-destructive topological sort.
//! - **Vertex**: id, execution state, and an opaque data payload.
//! - **Scheduler**: owns a `Graph`, runs the propagate/dispatch state machine,
//!   enforces the concurrency cap and failure policy, and fires a terminal
//!   callback exactly once per campaign.
//! - **Task**: the adapter contract external units of work implement.

pub mod config;
pub mod dag;
pub mod error;
pub mod telemetry;

pub use error::{ErrorCategory, GraphError, Result};

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::dag::{
        CampaignError, Graph, LogLevel, LogSink, OverallState, Scheduler, SchedulerConfig,
        SharedResults, Task, TaskOutcome, Vertex, VertexId, VertexState,
    };
    pub use crate::error::{ErrorCategory, GraphError, Result};
}
