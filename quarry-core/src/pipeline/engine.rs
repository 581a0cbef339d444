// quarry-core/src/pipeline/engine.rs
// Topological-level install orchestration over a finalized resolved graph.
// Two nodes install concurrently iff neither is an ancestor of the other;
// a node is dispatched to the worker pool only once every dependency has
// completed. A failed node aborts its own remaining actions and marks all
// transitive dependents skipped; unrelated subtrees run to completion, so
// partial success is a normal, reportable outcome.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Sender as CrossbeamSender};
use threadpool::ThreadPool;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use quarry_common::dependency::ResolvedGraph;
use quarry_common::error::{QuarryError, Result};
use quarry_common::model::ResolvedSpec;
use quarry_common::pipeline::PipelineEvent;

use crate::executor::{ActionExecutor, ActionSession};
use crate::install::{AdapterRegistry, InstallPlanner};
use crate::prefix::{InstallDisposition, PrefixStore};

const EVENT_CHANNEL_SIZE: usize = 256;

pub fn default_worker_count() -> usize {
    std::cmp::max(1, num_cpus::get_physical().saturating_sub(1)).min(6)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Running,
    Succeeded,
    Reused,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub succeeded: Vec<String>,
    pub reused: Vec<String>,
    pub failed: Vec<(String, QuarryError)>,
    pub skipped: Vec<(String, String)>,
}

impl InstallReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

pub struct InstallEngine {
    adapters: AdapterRegistry,
    executor: Arc<dyn ActionExecutor>,
    store: Arc<PrefixStore>,
    jobs: usize,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl InstallEngine {
    pub fn new(
        adapters: AdapterRegistry,
        executor: Arc<dyn ActionExecutor>,
        store: Arc<PrefixStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            adapters,
            executor,
            store,
            jobs: default_worker_count(),
            event_tx,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = std::cmp::max(1, jobs);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    pub fn run(&self, graph: &ResolvedGraph) -> Result<InstallReport> {
        let start = Instant::now();
        let order = graph.install_order();
        let _ = self.event_tx.send(PipelineEvent::PipelineStarted {
            total_jobs: order.len(),
        });

        let mut states: BTreeMap<String, NodeState> = order
            .iter()
            .map(|name| (name.clone(), NodeState::Pending))
            .collect();
        let mut remaining: BTreeMap<String, usize> = order
            .iter()
            .map(|name| (name.clone(), graph.dependencies_of(name).count()))
            .collect();
        let mut errors: HashMap<String, QuarryError> = HashMap::new();
        let mut skip_cause: HashMap<String, String> = HashMap::new();

        let pool = ThreadPool::new(self.jobs);
        let (done_tx, done_rx) = unbounded::<(String, Result<InstallDisposition>)>();

        let mut inflight = 0usize;
        for name in &order {
            if remaining.get(name.as_str()).copied() == Some(0) {
                self.dispatch(name, graph, &pool, &done_tx, &mut states);
                inflight += 1;
            }
        }

        while inflight > 0 {
            let (name, result) = done_rx
                .recv()
                .expect("engine holds a sender, channel cannot close");
            inflight -= 1;

            match result {
                Ok(disposition) => {
                    debug!("[{name}] completed ({disposition:?})");
                    let (state, event) = match disposition {
                        InstallDisposition::Installed => (
                            NodeState::Succeeded,
                            PipelineEvent::JobSuccess {
                                target_id: name.clone(),
                            },
                        ),
                        InstallDisposition::Reused => (
                            NodeState::Reused,
                            PipelineEvent::JobReused {
                                target_id: name.clone(),
                            },
                        ),
                    };
                    states.insert(name.clone(), state);
                    let _ = self.event_tx.send(event);

                    for dependent in graph.dependents_of(&name) {
                        if states.get(dependent) != Some(&NodeState::Pending) {
                            continue;
                        }
                        let count = remaining
                            .get_mut(dependent)
                            .expect("dependent tracked in remaining");
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            let dependent = dependent.to_string();
                            self.dispatch(&dependent, graph, &pool, &done_tx, &mut states);
                            inflight += 1;
                        }
                    }
                }
                Err(error) => {
                    warn!("[{name}] install failed: {error}");
                    let _ = self
                        .event_tx
                        .send(PipelineEvent::job_failed(name.clone(), &error));
                    states.insert(name.clone(), NodeState::Failed);
                    errors.insert(name.clone(), error);

                    // Transitive dependents are skipped, not failed.
                    let mut stack = vec![name.clone()];
                    while let Some(current) = stack.pop() {
                        for dependent in graph.dependents_of(&current) {
                            if states.get(dependent) == Some(&NodeState::Pending) {
                                states.insert(dependent.to_string(), NodeState::Skipped);
                                skip_cause.insert(dependent.to_string(), name.clone());
                                let _ = self.event_tx.send(PipelineEvent::JobSkipped {
                                    target_id: dependent.to_string(),
                                    failed_dependency: name.clone(),
                                });
                                stack.push(dependent.to_string());
                            }
                        }
                    }
                }
            }
        }
        pool.join();

        let mut report = InstallReport::default();
        for name in &order {
            match states.get(name.as_str()) {
                Some(NodeState::Succeeded) => report.succeeded.push(name.clone()),
                Some(NodeState::Reused) => report.reused.push(name.clone()),
                Some(NodeState::Failed) => {
                    let error = errors
                        .remove(name.as_str())
                        .expect("failed node recorded an error");
                    report.failed.push((name.clone(), error));
                }
                Some(NodeState::Skipped) => {
                    let cause = skip_cause
                        .remove(name.as_str())
                        .expect("skipped node recorded a cause");
                    report.skipped.push((name.clone(), cause));
                }
                _ => {}
            }
        }

        let _ = self.event_tx.send(PipelineEvent::PipelineFinished {
            duration_secs: start.elapsed().as_secs_f64(),
            success_count: report.succeeded.len() + report.reused.len(),
            fail_count: report.failed.len(),
            skip_count: report.skipped.len(),
        });
        Ok(report)
    }

    fn dispatch(
        &self,
        name: &str,
        graph: &ResolvedGraph,
        pool: &ThreadPool,
        done_tx: &CrossbeamSender<(String, Result<InstallDisposition>)>,
        states: &mut BTreeMap<String, NodeState>,
    ) {
        states.insert(name.to_string(), NodeState::Running);
        let _ = self.event_tx.send(PipelineEvent::JobProcessingStarted {
            target_id: name.to_string(),
        });

        let spec = graph.get(name).expect("dispatched node is in graph").clone();
        // Every direct dependency has completed by the time a node is
        // dispatched, so its prefix path is final.
        let dependency_prefixes: HashMap<String, PathBuf> = graph
            .dependencies_of(name)
            .map(|dep| {
                let dep_spec = graph.get(dep).expect("dependency is in graph");
                (
                    dep.to_string(),
                    self.store.prefix_path(dep, &dep_spec.version),
                )
            })
            .collect();

        let adapters = self.adapters.clone();
        let executor = Arc::clone(&self.executor);
        let store = Arc::clone(&self.store);
        let done_tx = done_tx.clone();
        let node = name.to_string();

        debug!("[{node}] dispatching to worker pool");
        pool.execute(move || {
            let result = install_node(
                &node,
                &spec,
                &dependency_prefixes,
                &adapters,
                executor.as_ref(),
                &store,
            );
            let _ = done_tx.send((node, result));
        });
    }
}

fn install_node(
    node: &str,
    spec: &ResolvedSpec,
    dependency_prefixes: &HashMap<String, PathBuf>,
    adapters: &AdapterRegistry,
    executor: &dyn ActionExecutor,
    store: &PrefixStore,
) -> Result<InstallDisposition> {
    let planner = adapters.get(&spec.recipe.installer)?;
    store.install_with(node, &spec.version, |prefix| {
        let actions = planner.plan(spec, prefix, dependency_prefixes)?;
        debug!("[{node}] planned {} install actions", actions.len());
        let mut session = executor.session(node);
        for action in &actions {
            session.apply(action).map_err(|e| match e {
                failed @ QuarryError::InstallActionFailed { .. } => failed,
                other => QuarryError::InstallActionFailed {
                    node: node.to_string(),
                    action: action.to_string(),
                    cause: other.to_string(),
                },
            })?;
        }
        Ok(())
    })
}
