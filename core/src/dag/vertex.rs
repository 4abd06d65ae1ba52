//! A single node in the graph: an id, an execution state, and a data payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Caller-chosen unique key identifying a vertex within its graph.
pub type VertexId = String;

/// Execution state of a vertex. Terminal states are `Success` and `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexState {
    NotReady,
    Ready,
    InProgress,
    Success,
    Fail,
}

impl VertexState {
    pub fn is_terminal(self) -> bool {
        matches!(self, VertexState::Success | VertexState::Fail)
    }
}

impl fmt::Display for VertexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VertexState::NotReady => "NOT_READY",
            VertexState::Ready => "READY",
            VertexState::InProgress => "IN_PROGRESS",
            VertexState::Success => "SUCCESS",
            VertexState::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

impl FromStr for VertexState {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_READY" => Ok(VertexState::NotReady),
            "READY" => Ok(VertexState::Ready),
            "IN_PROGRESS" => Ok(VertexState::InProgress),
            "SUCCESS" => Ok(VertexState::Success),
            "FAIL" => Ok(VertexState::Fail),
            other => Err(GraphError::InvalidState(other.to_string())),
        }
    }
}

/// A node in the graph.
///
/// Deliberately holds no reference back to its owning [`crate::dag::Graph`] or
/// [`crate::dag::scheduler::Scheduler`] — state transitions are driven by the
/// scheduler, which looks vertices up by id and reports completion via message
/// passing rather than a call back through the vertex itself.
#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    state: VertexState,
    data: serde_json::Value,
}

impl Vertex {
    pub fn new(id: impl Into<VertexId>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            state: VertexState::NotReady,
            data,
        }
    }

    pub fn id(&self) -> &VertexId {
        &self.id
    }

    pub fn state(&self) -> VertexState {
        self.state
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Overwrite the payload; last-written-wins.
    pub fn set_data(&mut self, data: serde_json::Value) {
        self.data = data;
    }

    /// Validate and commit a new state. Firing the per-vertex start signal and
    /// invoking the bound task are the scheduler's responsibility, not the
    /// vertex's — see [`crate::dag::scheduler::Scheduler::dispatch`].
    pub fn set_state(&mut self, new: VertexState) {
        self.state = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_vertex_starts_not_ready() {
        let v = Vertex::new("a", serde_json::Value::Null);
        assert_eq!(v.state(), VertexState::NotReady);
        assert!(!v.state().is_terminal());
    }

    #[test]
    fn state_round_trips_through_display_and_from_str() {
        for state in [
            VertexState::NotReady,
            VertexState::Ready,
            VertexState::InProgress,
            VertexState::Success,
            VertexState::Fail,
        ] {
            let parsed: VertexState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn unknown_state_name_is_invalid_state() {
        let err = "BOGUS".parse::<VertexState>().unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(_)));
    }
}
