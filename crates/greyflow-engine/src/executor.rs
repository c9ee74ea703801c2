use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use greyflow_core::config::EngineConfig;
use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::{ExecutionObserver, NullObserver, OperatorChannel};
use greyflow_core::types::{Graph, NodeKind, NodeStatus};

use crate::channel::InteractiveResolver;
use crate::context::{ExecutionContext, NodeResult};
use crate::dispatcher::NodeDispatcher;
use crate::scheduler::{self, Scheduler};
use crate::trace::Reporter;

/// Result of executing an entire workflow.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Aggregated text from the output (or terminal) nodes.
    pub output: String,
    /// Per-node results in processing order.
    pub node_results: Vec<NodeResult>,
    pub processing_order: Vec<String>,
    pub total_elapsed_ms: u64,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(ExecutionResult),
    /// Stopped through the cancellation token. Not a failure.
    Cancelled,
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Completed(result) => Some(&result.output),
            Self::Cancelled => None,
        }
    }
}

/// Runs a workflow graph to completion.
///
/// Nodes are scheduled by readiness, dispatched to their kind's handler and
/// resolved interactively through the operator channel when a handler
/// pauses. The first failing node aborts the run.
pub struct WorkflowExecutor {
    dispatcher: NodeDispatcher,
    config: EngineConfig,
    observer: Arc<dyn ExecutionObserver>,
    operator: Option<Arc<dyn OperatorChannel>>,
    cancel: CancellationToken,
}

impl WorkflowExecutor {
    pub fn new(dispatcher: NodeDispatcher, config: EngineConfig) -> Self {
        Self {
            dispatcher,
            config,
            observer: Arc::new(NullObserver),
            operator: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_operator(mut self, operator: Arc<dyn OperatorChannel>) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Cancelling this token stops every run started through [`run`](Self::run).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, graph: &Graph, starting_input: &str) -> Result<RunOutcome> {
        self.run_with_cancel(graph, starting_input, self.cancel.child_token())
            .await
    }

    pub async fn run_with_cancel(
        &self,
        graph: &Graph,
        starting_input: &str,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let reporter = Reporter::new(self.observer.clone());
        match self.execute(graph, starting_input, &reporter, &cancel).await {
            Ok(result) => {
                info!(
                    nodes = result.node_results.len(),
                    elapsed_ms = result.total_elapsed_ms,
                    "Workflow completed"
                );
                Ok(RunOutcome::Completed(result))
            }
            Err(e) if e.is_cancelled() => {
                let reset = reporter.reset_touched();
                reporter.step("Workflow cancelled");
                info!(reset, "Workflow cancelled");
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "Workflow failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        graph: &Graph,
        starting_input: &str,
        reporter: &Reporter,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        if graph.is_empty() {
            return Err(GreyflowError::EmptyWorkflow);
        }
        reporter.step("Starting workflow execution...");

        let mut ctx = ExecutionContext::new(graph, starting_input);
        if let Some(id) = ctx.fallback_input() {
            warn!(node_id = %id, "No input node found, using first node as input");
            reporter.step("No input node found, using first node as input");
        }

        let resolver = InteractiveResolver {
            dispatcher: &self.dispatcher,
            operator: self.operator.as_deref(),
            max_retries: self.config.max_interactive_retries,
            cancel,
            trace: reporter,
        };
        let mut scheduler = Scheduler::new(graph, self.config.max_pass_factor);

        loop {
            if cancel.is_cancelled() {
                return Err(GreyflowError::Cancelled);
            }
            let Some(node) = scheduler.next_ready(ctx.results()) else {
                break;
            };
            let name = node.display_name();
            reporter.step(format!("Processing node: {}", name));
            reporter.status(&node.id, NodeStatus::Executing);

            let input = ctx.resolve_input(graph, &node.id);
            let kind = ctx.effective_kind(&node.id, &node.kind);
            let started = Instant::now();
            info!(node_id = %node.id, kind = %kind, "Executing node");

            match resolver.resolve(node, &kind, input).await {
                Ok(resolution) => {
                    ctx.record(NodeResult {
                        node_id: node.id.clone(),
                        output: resolution.output,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        interactions: resolution.interactions,
                    });
                    reporter.status(&node.id, NodeStatus::Completed);
                    reporter.step(format!("Completed node: {}", name));
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    error!(node_id = %node.id, error = %e, "Node failed");
                    reporter.status(&node.id, NodeStatus::Error);
                    let line = match &e {
                        GreyflowError::NodeFailed { .. } => e.to_string(),
                        other => format!("Failed to execute node {}: {}", name, other),
                    };
                    reporter.step(line);
                    return Err(e);
                }
            }
        }

        let remaining = scheduler::unresolved(graph, ctx.results());
        if !remaining.is_empty() {
            let names: Vec<String> = remaining
                .iter()
                .map(|n| n.display_name().to_string())
                .collect();
            reporter.step(format!("Workflow incomplete. Unprocessed nodes: {}", names.join(", ")));
            for node in &remaining {
                reporter.status(&node.id, NodeStatus::Error);
            }
            return Err(GreyflowError::UnresolvedNodes { nodes: names });
        }

        let output = aggregate(graph, &ctx);
        reporter.step("Workflow completed successfully!");
        Ok(ExecutionResult {
            output,
            processing_order: ctx.processing_order(),
            total_elapsed_ms: ctx.elapsed_ms(),
            node_results: ctx.into_node_results(),
        })
    }
}

/// Final text of a run: every `output` node's result, else every terminal
/// node's result, joined by blank lines. Empty results are skipped.
fn aggregate(graph: &Graph, ctx: &ExecutionContext) -> String {
    let join = |ids: Vec<&str>| -> String {
        ids.into_iter()
            .filter_map(|id| ctx.result(id))
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let outputs: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Output)
        .map(|n| n.id.as_str())
        .collect();
    if !outputs.is_empty() {
        return join(outputs);
    }

    let terminals: Vec<&str> = graph.terminal_nodes().map(|n| n.id.as_str()).collect();
    if !terminals.is_empty() {
        return join(terminals);
    }

    // Every node has an outgoing edge only when the graph is cyclic, which
    // the scheduler already rejects.
    ctx.processing_order()
        .last()
        .and_then(|id| ctx.result(id))
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "No output generated".to_string())
}
