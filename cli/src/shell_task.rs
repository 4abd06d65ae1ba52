//! A [`graph_core::dag::Task`] that runs a shell command per vertex.

use std::process::Stdio;

use async_trait::async_trait;
use graph_core::dag::{SharedResults, Task, TaskOutcome};
use tokio::process::Command;

/// Runs `sh -c <command>`, capturing stdout/stderr and writing the vertex's
/// result under its own id as soon as it completes. Demonstrates the library
/// against real external work rather than an in-process closure.
pub struct ShellTask {
    command: String,
}

impl ShellTask {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

#[async_trait]
impl Task for ShellTask {
    async fn run(&self, vertex_id: &String, _results: SharedResults) -> TaskOutcome {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => TaskOutcome::Success(serde_json::json!({
                "vertex": vertex_id,
                "stdout": String::from_utf8_lossy(&out.stdout).trim_end(),
            })),
            Ok(out) => TaskOutcome::Failure(format!(
                "command exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim_end()
            )),
            Err(e) => TaskOutcome::Failure(format!("failed to spawn command: {e}")),
        }
    }
}
