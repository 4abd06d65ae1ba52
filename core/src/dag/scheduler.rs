//! The scheduler: owns one [`Graph`], runs the propagation/dispatch state
//! machine, enforces the concurrency cap and failure policy, and invokes the
//! terminal callback exactly once per campaign.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dag::task::{SharedResults, Task, TaskOutcome};
use crate::dag::vertex::{VertexId, VertexState};
use crate::dag::Graph;
use crate::error::{GraphError, Result};

/// The error carried to the terminal callback on campaign failure. An alias
/// over [`GraphError`]: every `kind` the spec's terminal callback can report
/// (`StateFailed`, `FailedStates`, and, for the escape-hatch `set_state`
/// entry point, `InvalidState` / `VertexNotFound`) is already a `GraphError`
/// variant, so no parallel enum is needed.
pub type CampaignError = GraphError;

/// User-supplied function invoked exactly once per campaign, with either
/// `None` (all vertices succeeded) or `Some(error)` describing the failure.
pub type TerminalCallback = Box<dyn FnMut(Option<CampaignError>, SharedResults) + Send>;

/// Minimum severity accepted by a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// An optional diagnostics sink. Logging is cosmetic: it never influences a
/// state transition, and a scheduler built without one falls back to `tracing`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &serde_json::Value);
}

/// Default sink used when a [`SchedulerConfig`] supplies none: forwards to
/// `tracing`, which is what "standard output" means once the process has
/// initialized the ambient subscriber (see [`crate::telemetry`]).
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str, context: &serde_json::Value) {
        match level {
            LogLevel::Info => tracing::info!(%context, "{message}"),
            LogLevel::Error => tracing::error!(%context, "{message}"),
        }
    }
}

/// Per-scheduler configuration, supplied once at construction.
pub struct SchedulerConfig {
    /// Human-readable name folded into `guid` for log correlation.
    pub name: String,
    /// Whether the first vertex failure aborts the whole campaign.
    pub quit_on_failure: bool,
    /// `<= 0` means unbounded; `> 0` is the hard concurrency cap.
    pub max_concurrent: i64,
    pub logging_sink: Option<Arc<dyn LogSink>>,
    pub logging_context: serde_json::Value,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "scheduler".to_string(),
            quit_on_failure: true,
            max_concurrent: 0,
            logging_sink: None,
            logging_context: serde_json::Value::Null,
        }
    }
}

/// A structured snapshot of scheduler state, returned by [`Scheduler::overall_state`].
#[derive(Debug, Clone)]
pub struct OverallState {
    pub guid: String,
    pub topo_order: Vec<VertexId>,
    pub states: HashMap<VertexState, Vec<VertexId>>,
    pub quit_on_failure: bool,
    pub running: bool,
    pub max_concurrent: i64,
    pub in_flight: i64,
    pub results: SharedResults,
}

impl OverallState {
    /// Human-readable multi-line rendering. Exact text is not normative.
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("scheduler {}\n", self.guid));
        out.push_str(&format!(
            "  running={} quit_on_failure={} max_concurrent={} in_flight={}\n",
            self.running, self.quit_on_failure, self.max_concurrent, self.in_flight
        ));
        for state in [
            VertexState::NotReady,
            VertexState::Ready,
            VertexState::InProgress,
            VertexState::Success,
            VertexState::Fail,
        ] {
            let ids = self.states.get(&state).cloned().unwrap_or_default();
            out.push_str(&format!("  {state}: [{}]\n", ids.join(", ")));
        }
        out
    }
}

impl fmt::Display for OverallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_print())
    }
}

struct SchedulerInner {
    graph: Graph,
    tasks: HashMap<VertexId, Arc<dyn Task>>,
    guid: String,
    running: bool,
    max_concurrent: i64,
    in_flight: i64,
    quit_on_failure: bool,
    terminal_fired: bool,
    topo_order: Vec<VertexId>,
    results: SharedResults,
    terminal_callback: Option<TerminalCallback>,
    logging_sink: Arc<dyn LogSink>,
    logging_context: serde_json::Value,
}

impl SchedulerInner {
    fn log(&self, level: LogLevel, message: &str) {
        self.logging_sink.log(level, message, &self.logging_context);
    }
}

/// Owns the graph and drives the campaign from `start` to the terminal callback.
///
/// Internally a single `tokio::sync::Mutex<SchedulerInner>` is the scheduler's
/// sole mutator: every public entry point, and every spawned task's
/// completion, re-acquires the same lock before touching graph state,
/// `in_flight`, `running`, or `terminal_fired`. This realizes the
/// single-writer discipline the design calls for without a background event
/// loop that would otherwise have to be kept alive for the scheduler's
/// lifetime.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, terminal_callback: TerminalCallback) -> Self {
        let guid = format!("{}-{}", config.name, Uuid::new_v4());
        let inner = SchedulerInner {
            graph: Graph::new(),
            tasks: HashMap::new(),
            guid,
            running: false,
            max_concurrent: config.max_concurrent,
            in_flight: 0,
            quit_on_failure: config.quit_on_failure,
            terminal_fired: false,
            topo_order: Vec::new(),
            results: Arc::new(dashmap::DashMap::new()),
            terminal_callback: Some(terminal_callback),
            logging_sink: config.logging_sink.unwrap_or_else(|| Arc::new(TracingLogSink)),
            logging_context: config.logging_context,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Create a vertex bound to `task`. Only valid while the scheduler is not running.
    pub async fn add_vertex(&self, id: impl Into<VertexId>, task: Arc<dyn Task>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let id = id.into();
        guard.graph.add_vertex(id.clone(), serde_json::Value::Null)?;
        guard.tasks.insert(id, task);
        Ok(())
    }

    /// Delegates to `Graph::add_edge`. Only valid while the scheduler is not running.
    pub async fn add_edge(&self, start: &str, end: &str) -> Result<()> {
        self.inner.lock().await.graph.add_edge(start, end)
    }

    /// Begin a campaign. Computes the topological order, resets every vertex
    /// to `NOT_READY`, and performs the first propagate + dispatch pass.
    /// Returns immediately; progress is driven by subsequent completions.
    ///
    /// Re-invocable after a prior campaign's terminal callback has fired: this
    /// resets `terminal_fired`, `in_flight`, and every vertex state exactly as
    /// a fresh campaign would.
    pub async fn start(&self, results: SharedResults) -> Result<()> {
        let mut guard = self.inner.lock().await;

        let topo = guard.graph.topological_sort();
        if topo.len() != guard.graph.vertex_count() {
            return Err(GraphError::CyclicGraph);
        }

        guard.results = results;
        guard.terminal_fired = false;
        guard.topo_order = topo;
        guard.in_flight = 0;
        guard.running = true;

        let ids = guard.graph.vertex_ids();
        for id in ids {
            guard.graph.vertex_mut(&id).expect("known id").set_state(VertexState::NotReady);
        }

        Self::propagate(&mut guard);

        if guard.graph.vertex_count() == 0 {
            guard.running = false;
            Self::fire_terminal(&mut guard, None);
            return Ok(());
        }

        Self::dispatch(&mut guard, &self.inner);
        Ok(())
    }

    /// The scheduler's internal commit point for a vertex state transition;
    /// also callable directly as an escape hatch. See the module docs for the
    /// full SUCCESS/FAIL commit algorithm.
    pub async fn set_state(&self, id: &str, new: VertexState) -> Result<()> {
        let mut guard = self.inner.lock().await;
        Self::commit(&mut guard, &self.inner, id, new)
    }

    /// Like [`Scheduler::set_state`] but takes the state by name, surfacing
    /// `GraphError::InvalidState` for an unrecognized one the way the spec's
    /// `Vertex.setState` does.
    pub async fn set_state_named(&self, id: &str, new: &str) -> Result<()> {
        let state: VertexState = new.parse()?;
        self.set_state(id, state).await
    }

    fn commit(
        inner: &mut SchedulerInner,
        inner_arc: &Arc<Mutex<SchedulerInner>>,
        id: &str,
        new: VertexState,
    ) -> Result<()> {
        if !inner.graph.has_vertex(id) {
            return Err(GraphError::VertexNotFound(id.to_string()));
        }
        inner.graph.vertex_mut(id).expect("checked above").set_state(new);
        match new {
            VertexState::Success => Self::commit_success(inner, inner_arc, id),
            VertexState::Fail => Self::commit_fail(inner, inner_arc, id),
            _ => {}
        }
        Ok(())
    }

    fn commit_success(inner: &mut SchedulerInner, inner_arc: &Arc<Mutex<SchedulerInner>>, id: &str) {
        inner.in_flight -= 1;
        Self::propagate(inner);

        let all_success = inner.graph.vertices().all(|v| v.state() == VertexState::Success);
        let all_final = inner.graph.vertices().all(|v| v.state().is_terminal());

        if all_final {
            inner.running = false;
            let err = if all_success {
                None
            } else {
                Some(Self::failed_states_error(inner))
            };
            Self::fire_terminal(inner, err);
            return;
        }

        let any_failed = inner.graph.vertices().any(|v| v.state() == VertexState::Fail);
        if any_failed {
            if inner.quit_on_failure {
                inner.running = false;
                Self::fire_terminal(inner, Some(Self::failed_states_error(inner)));
                return;
            }
            // Re-propagate to mark newly-poisoned descendants; dispatch below
            // simply finds no READY roots inside the failed subtree.
            Self::propagate(inner);
        }

        Self::dispatch(inner, inner_arc);
    }

    fn commit_fail(inner: &mut SchedulerInner, inner_arc: &Arc<Mutex<SchedulerInner>>, id: &str) {
        inner.in_flight -= 1;
        Self::propagate(inner);

        if inner.quit_on_failure {
            inner.running = false;
            Self::fire_terminal(inner, Some(GraphError::StateFailed(id.to_string())));
            return;
        }

        Self::propagate(inner);
        let all_final = inner.graph.vertices().all(|v| v.state().is_terminal());
        let any_failed = inner.graph.vertices().any(|v| v.state() == VertexState::Fail);
        if all_final && any_failed {
            inner.running = false;
            Self::fire_terminal(inner, Some(Self::failed_states_error(inner)));
            return;
        }

        // Freeing in_flight may let a capped READY vertex in an independent
        // branch start; dispatch picks it up.
        Self::dispatch(inner, inner_arc);
    }

    fn fire_terminal(inner: &mut SchedulerInner, err: Option<CampaignError>) {
        if inner.terminal_fired {
            return;
        }
        inner.terminal_fired = true;
        if let Some(e) = &err {
            e.log();
        }
        if let Some(cb) = inner.terminal_callback.as_mut() {
            cb(err, inner.results.clone());
        }
    }

    fn failed_states_error(inner: &SchedulerInner) -> GraphError {
        let ids: Vec<VertexId> = inner
            .graph
            .vertices()
            .filter(|v| v.state() == VertexState::Fail)
            .map(|v| v.id().clone())
            .collect();
        GraphError::FailedStates(ids)
    }

    /// Two-pass propagation: compute every vertex's new state from a single
    /// consistent snapshot of prior states, then apply them all at once.
    fn propagate(inner: &mut SchedulerInner) {
        let mut updates: Vec<(VertexId, VertexState)> = Vec::new();

        for id in inner.topo_order.clone() {
            let Some(v) = inner.graph.vertex(&id) else { continue };
            if v.state() != VertexState::NotReady {
                continue;
            }
            let indegree = inner.graph.indegree(&id);
            let new_state = if indegree == 0 {
                VertexState::Ready
            } else {
                let parents = inner.graph.parents(&id);
                let all_success = parents.iter().all(|p| {
                    inner
                        .graph
                        .vertex(p)
                        .map(|pv| pv.state() == VertexState::Success)
                        .unwrap_or(false)
                });
                if all_success {
                    VertexState::Ready
                } else {
                    let any_failed = parents.iter().any(|p| {
                        inner
                            .graph
                            .vertex(p)
                            .map(|pv| pv.state() == VertexState::Fail)
                            .unwrap_or(false)
                    });
                    if any_failed {
                        VertexState::Fail
                    } else {
                        VertexState::NotReady
                    }
                }
            };
            updates.push((id, new_state));
        }

        for (id, new_state) in updates {
            if new_state != VertexState::NotReady {
                inner.graph.vertex_mut(&id).expect("known id").set_state(new_state);
            }
        }
    }

    /// Start every READY vertex, up to the concurrency cap, by spawning its
    /// bound task and routing the eventual outcome back through `commit`.
    fn dispatch(inner: &mut SchedulerInner, inner_arc: &Arc<Mutex<SchedulerInner>>) {
        let ready: Vec<VertexId> = inner
            .graph
            .vertices()
            .filter(|v| v.state() == VertexState::Ready)
            .map(|v| v.id().clone())
            .collect();

        for id in ready {
            if inner.max_concurrent > 0 && inner.in_flight >= inner.max_concurrent {
                break;
            }
            inner.in_flight += 1;
            inner.graph.vertex_mut(&id).expect("known id").set_state(VertexState::InProgress);
            inner.log(LogLevel::Info, &format!("vertex {id} started"));

            let task = inner.tasks.get(&id).cloned().expect("task bound at add_vertex");
            let results = inner.results.clone();
            let inner_arc = inner_arc.clone();
            let vertex_id = id.clone();

            tokio::spawn(async move {
                let outcome = task.run(&vertex_id, results).await;
                let mut guard = inner_arc.lock().await;
                match outcome {
                    TaskOutcome::Success(data) => {
                        if let Some(v) = guard.graph.vertex_mut(&vertex_id) {
                            v.set_data(data);
                        }
                        Self::commit_success(&mut guard, &inner_arc, &vertex_id);
                    }
                    TaskOutcome::Failure(message) => {
                        guard.log(LogLevel::Error, &format!("vertex {vertex_id} failed: {message}"));
                        Self::commit_fail(&mut guard, &inner_arc, &vertex_id);
                    }
                }
            });
        }
    }

    /// A structured snapshot of the current scheduler state.
    pub async fn overall_state(&self) -> OverallState {
        let guard = self.inner.lock().await;
        let mut states: HashMap<VertexState, Vec<VertexId>> = HashMap::new();
        for v in guard.graph.vertices() {
            states.entry(v.state()).or_default().push(v.id().clone());
        }
        OverallState {
            guid: guard.guid.clone(),
            topo_order: guard.topo_order.clone(),
            states,
            quit_on_failure: guard.quit_on_failure,
            running: guard.running,
            max_concurrent: guard.max_concurrent,
            in_flight: guard.in_flight,
            results: guard.results.clone(),
        }
    }

    /// The live results reference tasks write into and the terminal callback receives.
    pub async fn get_results(&self) -> SharedResults {
        self.inner.lock().await.results.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::task::FnTask;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn succeeding_task() -> Arc<dyn Task> {
        Arc::new(FnTask::new(|id: VertexId, results: SharedResults| async move {
            results.insert(id.clone(), serde_json::json!("ok"));
            TaskOutcome::Success(serde_json::json!("ok"))
        }))
    }

    fn failing_task() -> Arc<dyn Task> {
        Arc::new(FnTask::new(|_id: VertexId, _results: SharedResults| async move {
            TaskOutcome::Failure("boom".to_string())
        }))
    }

    fn callback_capturing(
    ) -> (TerminalCallback, oneshot::Receiver<(Option<CampaignError>, SharedResults)>) {
        let (tx, rx) = oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        let cb: TerminalCallback = Box::new(move |err, results| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send((err, results));
            }
        });
        (cb, rx)
    }

    #[tokio::test]
    async fn empty_graph_terminates_immediately_with_success() {
        let (cb, rx) = callback_capturing();
        let scheduler = Scheduler::new(SchedulerConfig::default(), cb);
        scheduler.start(Arc::new(dashmap::DashMap::new())).await.unwrap();
        let (err, _) = rx.await.unwrap();
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn cycle_is_rejected_synchronously_at_start() {
        let (cb, _rx) = callback_capturing();
        let scheduler = Scheduler::new(SchedulerConfig::default(), cb);
        scheduler.add_vertex("a", succeeding_task()).await.unwrap();
        scheduler.add_vertex("b", succeeding_task()).await.unwrap();
        scheduler.add_edge("a", "b").await.unwrap();
        scheduler.add_edge("b", "a").await.unwrap();
        let err = scheduler.start(Arc::new(dashmap::DashMap::new())).await.unwrap_err();
        assert_eq!(err, GraphError::CyclicGraph);
        let state = scheduler.overall_state().await;
        assert!(!state.running);
    }

    #[tokio::test]
    async fn diamond_quit_on_failure_false_reports_failed_states() {
        let (cb, rx) = callback_capturing();
        let mut config = SchedulerConfig::default();
        config.quit_on_failure = false;
        let scheduler = Scheduler::new(config, cb);
        scheduler.add_vertex("a", succeeding_task()).await.unwrap();
        scheduler.add_vertex("b", succeeding_task()).await.unwrap();
        scheduler.add_vertex("c", failing_task()).await.unwrap();
        scheduler.add_vertex("d", succeeding_task()).await.unwrap();
        scheduler.add_edge("a", "b").await.unwrap();
        scheduler.add_edge("a", "c").await.unwrap();
        scheduler.add_edge("c", "d").await.unwrap();

        scheduler.start(Arc::new(dashmap::DashMap::new())).await.unwrap();
        let (err, _) = rx.await.unwrap();
        match err {
            Some(GraphError::FailedStates(mut ids)) => {
                ids.sort();
                assert_eq!(ids, vec!["c".to_string(), "d".to_string()]);
            }
            other => panic!("expected FailedStates, got {other:?}"),
        }

        let state = scheduler.overall_state().await;
        assert!(!state.running);
        assert_eq!(state.states.get(&VertexState::Success).map(|v| v.len()), Some(2));
        assert_eq!(state.states.get(&VertexState::Fail).map(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn terminal_callback_fires_at_most_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        let cb: TerminalCallback = Box::new(move |_, _| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });
        let scheduler = Scheduler::new(SchedulerConfig::default(), cb);
        scheduler.add_vertex("a", succeeding_task()).await.unwrap();
        scheduler.start(Arc::new(dashmap::DashMap::new())).await.unwrap();
        // Give the spawned task a chance to complete and commit.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        // A redundant external transition must not re-fire the callback.
        let _ = scheduler.set_state("a", VertexState::Success).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn set_state_named_rejects_unknown_state() {
        let (cb, _rx) = callback_capturing();
        let scheduler = Scheduler::new(SchedulerConfig::default(), cb);
        scheduler.add_vertex("a", succeeding_task()).await.unwrap();
        let err = scheduler.set_state_named("a", "NOPE").await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(_)));
    }

    #[tokio::test]
    async fn set_state_unknown_vertex_fails() {
        let (cb, _rx) = callback_capturing();
        let scheduler = Scheduler::new(SchedulerConfig::default(), cb);
        let err = scheduler.set_state("ghost", VertexState::Success).await.unwrap_err();
        assert!(matches!(err, GraphError::VertexNotFound(_)));
    }
}
