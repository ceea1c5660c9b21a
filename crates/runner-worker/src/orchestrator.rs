// Run orchestrator: drives one run end-to-end. Loaded and
// invoked once per run by the `WorkflowRunner` backend (see `runner`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use runner_core::{Event, ExecutorRegistry, NodeId, Plan, RunStatus, StepStatus};
use runner_storage::{RunRepository, UpdateRunStatus, UpdateStep};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};
use crate::event_bus::EventBus;
use crate::workflow_client::WorkflowClient;

/// Out-of-band cancellation signal, polled at each node boundary. Optional
/// and best-effort; absent entirely for runs started without cancellation
/// support wired up.
#[derive(Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    db: Arc<dyn RunRepository>,
    registry: Arc<ExecutorRegistry>,
    bus: EventBus,
    workflow_client: WorkflowClient,
}

impl Orchestrator {
    pub fn new(
        db: Arc<dyn RunRepository>,
        registry: Arc<ExecutorRegistry>,
        bus: EventBus,
        workflow_client: WorkflowClient,
    ) -> Self {
        Self {
            db,
            registry,
            bus,
            workflow_client,
        }
    }

    pub async fn run(&self, run_id: Uuid, cancel: CancelSignal) -> WorkerResult<()> {
        let run = self.db.get_run(run_id).await?;

        // Idempotent submission: a non-pending run is already underway (or
        // finished); resuming replays succeeded steps rather than redoing
        // them, and treats any in-doubt `running` step as abandoned.
        if run.status() != RunStatus::Pending {
            tracing::info!(run_id = %run_id, status = %run.status(), "resuming in-progress run");
        } else {
            self.db
                .update_run_status(
                    run_id,
                    UpdateRunStatus {
                        status: RunStatus::Running.to_string(),
                        started_at: Some(Utc::now()),
                        ..Default::default()
                    },
                )
                .await?;
            self.bus
                .publish(run_id, Event::run_started(run_id, Utc::now()))
                .await;
        }

        match self.execute(run_id, run.workflow_id, run.org_id, cancel).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.fail_run(run_id, &err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        workflow_id: Uuid,
        org_id: Option<Uuid>,
        cancel: CancelSignal,
    ) -> WorkerResult<()> {
        let graph = self.workflow_client.fetch_graph(workflow_id).await?;

        if graph.nodes.is_empty() {
            return Err(WorkerError::EmptyWorkflow);
        }

        let plan = Plan::build(&graph)?;

        let existing_steps = self.db.list_steps(run_id).await?;
        let mut executed: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
        let mut outputs: std::collections::HashMap<NodeId, Value> =
            std::collections::HashMap::new();

        for step in &existing_steps {
            if step.status() == StepStatus::Succeeded {
                executed.insert(step.node_id.clone());
                outputs.insert(
                    step.node_id.clone(),
                    step.output_json.clone().unwrap_or(Value::Null),
                );
            }
        }

        let mut ready: VecDeque<NodeId> = plan.trigger_nodes().iter().cloned().collect();
        for node_id in &executed {
            ready.extend(plan.successors(node_id).iter().cloned());
        }

        while let Some(node_id) = ready.pop_front() {
            if executed.contains(&node_id) {
                continue;
            }

            let deps = plan.deps(&node_id);
            if !deps.iter().all(|d| executed.contains(d)) {
                ready.push_back(node_id);
                tokio::task::yield_now().await;
                continue;
            }

            if cancel.is_triggered() {
                self.finish_run(run_id, RunStatus::Cancelled, None).await?;
                return Ok(());
            }

            let node = plan
                .node(&node_id)
                .expect("planner guarantees every queued node id resolves");

            let step = self.db.upsert_step(run_id, org_id, &node_id).await?;

            if step.status() == StepStatus::Succeeded {
                outputs.insert(
                    node_id.clone(),
                    step.output_json.clone().unwrap_or(Value::Null),
                );
                executed.insert(node_id.clone());
                ready.extend(plan.successors(&node_id).iter().cloned());
                continue;
            }

            let input = merge_dep_outputs(deps, &outputs);
            self.db
                .update_step(
                    step.id,
                    UpdateStep {
                        input_json: Some(input.clone().unwrap_or(Value::Null)),
                        ..Default::default()
                    },
                )
                .await?;

            self.bus
                .publish(
                    run_id,
                    Event::step_started(step.id, &node_id, &node.data.node_type),
                )
                .await;
            self.db
                .update_step(
                    step.id,
                    UpdateStep {
                        status: Some(StepStatus::Running.to_string()),
                        started_at: Some(Utc::now()),
                        ..Default::default()
                    },
                )
                .await?;

            let executor = self.registry.get(&node.data.node_type).ok_or_else(|| {
                WorkerError::Other(anyhow::anyhow!(
                    "no executor registered for node type '{}'",
                    node.data.node_type
                ))
            });

            let outcome = match executor {
                Ok(executor) => executor
                    .execute(&node.data.properties, input.as_ref())
                    .await
                    .map_err(anyhow::Error::from),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(output) => {
                    self.db
                        .update_step(
                            step.id,
                            UpdateStep {
                                status: Some(StepStatus::Succeeded.to_string()),
                                output_json: Some(output.clone()),
                                finished_at: Some(Utc::now()),
                                ..Default::default()
                            },
                        )
                        .await?;
                    self.bus
                        .publish(
                            run_id,
                            Event::step_succeeded(step.id, &node_id, &output),
                        )
                        .await;

                    outputs.insert(node_id.clone(), output);
                    executed.insert(node_id.clone());
                    ready.extend(plan.successors(&node_id).iter().cloned());
                }
                Err(err) => {
                    let message = err.to_string();
                    self.db
                        .update_step(
                            step.id,
                            UpdateStep {
                                status: Some(StepStatus::Failed.to_string()),
                                error: Some(message.clone()),
                                finished_at: Some(Utc::now()),
                                ..Default::default()
                            },
                        )
                        .await?;
                    self.bus
                        .publish(run_id, Event::step_failed(step.id, &node_id, &message))
                        .await;
                    return Err(WorkerError::Other(anyhow::anyhow!(message)));
                }
            }
        }

        self.finish_run(run_id, RunStatus::Completed, None).await
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        error: Option<String>,
    ) -> WorkerResult<()> {
        let finished_at = Utc::now();
        self.db
            .update_run_status(
                run_id,
                UpdateRunStatus {
                    status: status.to_string(),
                    finished_at: Some(finished_at),
                    error: error.clone(),
                    ..Default::default()
                },
            )
            .await?;
        self.bus
            .publish(
                run_id,
                Event::run_finished(run_id, status, error.as_deref(), finished_at),
            )
            .await;
        Ok(())
    }

    async fn fail_run(&self, run_id: Uuid, error: &str) {
        if let Err(err) = self
            .finish_run(run_id, RunStatus::Failed, Some(error.to_string()))
            .await
        {
            tracing::error!(run_id = %run_id, error = %err, "failed to persist run failure");
        }
    }
}

/// Shallow-merge dependency outputs: deps are already lexicographically
/// sorted by the planner, so iterating them in order and overwriting
/// top-level keys gives "later deps win, ties broken by node id" for free.
/// A single dep's output (or a trigger node's absence of deps) passes
/// through unchanged; non-object outputs fall back to "last dep wins".
fn merge_dep_outputs(deps: &[NodeId], outputs: &std::collections::HashMap<NodeId, Value>) -> Option<Value> {
    if deps.is_empty() {
        return None;
    }
    if deps.len() == 1 {
        return outputs.get(&deps[0]).cloned();
    }

    let mut merged = serde_json::Map::new();
    let mut last_scalar: Option<Value> = None;
    for dep in deps {
        match outputs.get(dep) {
            Some(Value::Object(map)) => merged.extend(map.clone()),
            Some(other) => last_scalar = Some(other.clone()),
            None => {}
        }
    }

    if merged.is_empty() {
        last_scalar
    } else {
        Some(Value::Object(merged))
    }
}
