//! The task adapter contract: how an external unit of work reports back to the scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::dag::vertex::VertexId;

/// The shared, caller-supplied results map. Handed to every task's `run` and to
/// the terminal callback. The map itself is concurrency-safe; concurrent writes
/// to the *same* key by different tasks still race, per the scheduler's
/// stated convention that each task writes only under its own vertex id.
pub type SharedResults = Arc<DashMap<String, serde_json::Value>>;

/// What a task reports when it finishes. A task reports exactly one of these,
/// exactly once — the return value of `run` itself, rather than a pair of
/// emitted signals, so a second report is structurally impossible.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Success(serde_json::Value),
    Failure(String),
}

/// A concrete unit of work bound to a vertex.
///
/// Mirrors the spec's "start function that asynchronously emits success or
/// error" with a single async method whose return value *is* the one-shot
/// signal: there is no separate callback registration step, so a task cannot
/// violate the one-shot contract by construction.
#[async_trait]
pub trait Task: Send + Sync {
    /// Run this task to completion, given the campaign's shared results map.
    async fn run(&self, vertex_id: &VertexId, results: SharedResults) -> TaskOutcome;
}

/// A [`Task`] built from a plain async closure, for tests and simple cases.
pub struct FnTask<F> {
    f: F,
}

impl<F> FnTask<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn(VertexId, SharedResults) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = TaskOutcome> + Send,
{
    async fn run(&self, vertex_id: &VertexId, results: SharedResults) -> TaskOutcome {
        (self.f)(vertex_id.clone(), results).await
    }
}
