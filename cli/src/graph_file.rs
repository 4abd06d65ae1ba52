//! JSON/YAML description of a campaign: vertices, their shell commands, and
//! the edges between them.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use graph_core::dag::{Scheduler, SchedulerConfig, Task};
use serde::Deserialize;

use crate::shell_task::ShellTask;

#[derive(Debug, Deserialize)]
pub struct VertexSpec {
    pub id: String,
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphFile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_quit_on_failure")]
    pub quit_on_failure: bool,
    #[serde(default)]
    pub max_concurrent: i64,
    pub vertices: Vec<VertexSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

fn default_name() -> String {
    "campaign".to_string()
}
fn default_quit_on_failure() -> bool {
    true
}

impl GraphFile {
    /// Parse a `.json`, `.yaml`, or `.yml` file by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading graph file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw).context("parsing graph file as JSON"),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw).context("parsing graph file as YAML"),
            other => anyhow::bail!("unsupported graph file extension: {other:?}"),
        }
    }

    /// Build a [`Scheduler`] bound to [`ShellTask`]s, with every vertex and
    /// edge from this description already added.
    pub async fn into_scheduler(
        self,
        terminal_callback: graph_core::dag::scheduler::TerminalCallback,
    ) -> Result<Scheduler> {
        let config = SchedulerConfig {
            name: self.name,
            quit_on_failure: self.quit_on_failure,
            max_concurrent: self.max_concurrent,
            ..SchedulerConfig::default()
        };
        let scheduler = Scheduler::new(config, terminal_callback);

        for vertex in &self.vertices {
            let task: Arc<dyn Task> = Arc::new(ShellTask::new(vertex.command.clone()));
            scheduler
                .add_vertex(vertex.id.clone(), task)
                .await
                .with_context(|| format!("adding vertex {}", vertex.id))?;
        }
        for edge in &self.edges {
            scheduler
                .add_edge(&edge.from, &edge.to)
                .await
                .with_context(|| format!("adding edge {} -> {}", edge.from, edge.to))?;
        }

        Ok(scheduler)
    }
}
