//! Graph storage and topological sort for the DAG scheduler.
//!
//! This module handles:
//! - Vertex and edge storage via adjacency maps (not parallel arrays)
//! - Degree and adjacency queries
//! - A non-destructive topological sort (Kahn's algorithm over an indegree copy)

pub mod scheduler;
pub mod task;
pub mod vertex;

pub use scheduler::{CampaignError, LogLevel, LogSink, OverallState, Scheduler, SchedulerConfig};
pub use task::{SharedResults, Task, TaskOutcome};
pub use vertex::{Vertex, VertexId, VertexState};

use std::collections::{HashMap, HashSet};

use crate::error::{GraphError, Result};

/// A directed acyclic graph of [`Vertex`] nodes connected by directed edges.
///
/// Edges are stored as two adjacency maps (children and the reverse, parents)
/// rather than an edge list or parallel index arrays, giving O(1) indegree,
/// outdegree, and adjacency lookups.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    vertices: HashMap<VertexId, Vertex>,
    order: Vec<VertexId>,
    children: HashMap<VertexId, HashSet<VertexId>>,
    parents: HashMap<VertexId, HashSet<VertexId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_vertex(&self, id: &str) -> bool {
        self.vertices.contains_key(id)
    }

    /// Insert a new vertex. Fails with [`GraphError::DuplicateVertex`] if `id` is taken.
    pub fn add_vertex(&mut self, id: impl Into<VertexId>, data: serde_json::Value) -> Result<&Vertex> {
        let id = id.into();
        if self.vertices.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id));
        }
        self.children.insert(id.clone(), HashSet::new());
        self.parents.insert(id.clone(), HashSet::new());
        self.order.push(id.clone());
        self.vertices.insert(id.clone(), Vertex::new(id.clone(), data));
        Ok(self.vertices.get(&id).expect("just inserted"))
    }

    /// Insert a directed edge `start -> end` ("end depends on start").
    pub fn add_edge(&mut self, start: &str, end: &str) -> Result<()> {
        if start == end {
            return Err(GraphError::SelfLoop(start.to_string()));
        }
        if !self.vertices.contains_key(start) {
            return Err(GraphError::VertexNotFound(start.to_string()));
        }
        if !self.vertices.contains_key(end) {
            return Err(GraphError::VertexNotFound(end.to_string()));
        }
        let children = self.children.get_mut(start).expect("vertex exists");
        if !children.insert(end.to_string()) {
            return Err(GraphError::DuplicateEdge(start.to_string(), end.to_string()));
        }
        self.parents
            .get_mut(end)
            .expect("vertex exists")
            .insert(start.to_string());
        Ok(())
    }

    /// Remove a vertex and every edge incident to it.
    pub fn remove_vertex(&mut self, id: &str) -> Result<()> {
        if !self.vertices.contains_key(id) {
            return Err(GraphError::VertexNotFound(id.to_string()));
        }
        let children = self.children.remove(id).unwrap_or_default();
        for child in &children {
            if let Some(p) = self.parents.get_mut(child) {
                p.remove(id);
            }
        }
        let parents = self.parents.remove(id).unwrap_or_default();
        for parent in &parents {
            if let Some(c) = self.children.get_mut(parent) {
                c.remove(id);
            }
        }
        self.vertices.remove(id);
        self.order.retain(|v| v != id);
        Ok(())
    }

    /// Remove a single edge. Fails with [`GraphError::EdgeNotFound`] if absent.
    pub fn remove_edge(&mut self, start: &str, end: &str) -> Result<()> {
        let removed = self
            .children
            .get_mut(start)
            .map(|c| c.remove(end))
            .unwrap_or(false);
        if !removed {
            return Err(GraphError::EdgeNotFound(start.to_string(), end.to_string()));
        }
        if let Some(p) = self.parents.get_mut(end) {
            p.remove(start);
        }
        Ok(())
    }

    pub fn children(&self, id: &str) -> Vec<VertexId> {
        self.children
            .get(id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn parents(&self, id: &str) -> Vec<VertexId> {
        self.parents
            .get(id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn indegree(&self, id: &str) -> usize {
        self.parents.get(id).map(|s| s.len()).unwrap_or(0)
    }

    pub fn outdegree(&self, id: &str) -> usize {
        self.children.get(id).map(|s| s.len()).unwrap_or(0)
    }

    pub fn roots(&self) -> Vec<VertexId> {
        self.order
            .iter()
            .filter(|id| self.indegree(id) == 0)
            .cloned()
            .collect()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.order.iter().filter_map(|id| self.vertices.get(id))
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn vertex_mut(&mut self, id: &str) -> Option<&mut Vertex> {
        self.vertices.get_mut(id)
    }

    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.order.clone()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(|c| c.len()).sum()
    }

    /// Kahn's algorithm. Returns a full topological order, or an empty vector
    /// if the graph contains a cycle.
    ///
    /// Non-destructive: the real edge maps are never mutated. Only a scratch
    /// copy of indegree counters is touched during the walk.
    pub fn topological_sort(&self) -> Vec<VertexId> {
        let mut indegree: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|id| (id.as_str(), self.indegree(id)))
            .collect();

        let mut ready: Vec<&str> = self
            .order
            .iter()
            .map(|s| s.as_str())
            .filter(|id| indegree[id] == 0)
            .collect();

        let mut output = Vec::with_capacity(self.order.len());
        while let Some(n) = ready.pop() {
            output.push(n.to_string());
            if let Some(children) = self.children.get(n) {
                for m in children {
                    let entry = indegree.get_mut(m.as_str()).expect("child is a known vertex");
                    *entry -= 1;
                    if *entry == 0 {
                        ready.push(m.as_str());
                    }
                }
            }
        }

        if output.len() != self.order.len() {
            return Vec::new();
        }
        output
    }
}
