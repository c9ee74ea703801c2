//! Suspend/resume loop for nodes that need the operator.
//!
//! A handler that cannot finish returns `NeedsInput` or `NeedsMoreInfo`.
//! The loop asks the operator, folds the answer into the next request and
//! invokes the handler again. Every await races the run's cancellation
//! token.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::{ExecutionObserver, OperatorChannel};
use greyflow_core::types::{ChatMessage, Node, NodeKind};

use crate::dispatcher::{NodeDispatcher, NodeRequest, NodeResponse};

/// Await `fut` unless `cancel` fires first.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(GreyflowError::Cancelled);
    }
    tokio::select! {
        result = fut => result,
        _ = cancel.cancelled() => Err(GreyflowError::Cancelled),
    }
}

/// Final value of an interactively resolved node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub output: String,
    pub interactions: u32,
}

pub struct InteractiveResolver<'a> {
    pub dispatcher: &'a NodeDispatcher,
    pub operator: Option<&'a dyn OperatorChannel>,
    /// Operator round-trips allowed per node.
    pub max_retries: u32,
    pub cancel: &'a CancellationToken,
    pub trace: &'a dyn ExecutionObserver,
}

impl InteractiveResolver<'_> {
    /// Drive `node` until its handler completes. Handler failures come back
    /// wrapped in `NodeFailed`; structural and cancellation errors pass
    /// through untouched.
    pub async fn resolve(&self, node: &Node, kind: &NodeKind, input: String) -> Result<Resolution> {
        let name = node.display_name();
        let mut request = NodeRequest::new(input);
        let mut answers: u32 = 0;

        loop {
            let response = cancellable(
                self.cancel,
                self.dispatcher.dispatch(node, kind, &request, self.trace),
            )
            .await
            .map_err(|e| wrap_handler_error(name, e))?;

            let (message, reply) = match response {
                NodeResponse::Complete(output) => {
                    return Ok(Resolution {
                        output,
                        interactions: answers,
                    })
                }
                NodeResponse::NeedsInput { prompt } => (prompt, None),
                NodeResponse::NeedsMoreInfo { request: ask, reply } => (ask, Some(reply)),
            };

            if answers >= self.max_retries {
                return Err(GreyflowError::MaxRetriesExceeded {
                    node: name.to_string(),
                    attempts: answers,
                });
            }
            let operator = self.operator.ok_or_else(|| GreyflowError::OperatorUnavailable {
                node: name.to_string(),
            })?;
            answers += 1;

            match reply {
                None => {
                    info!(node_id = %node.id, attempt = answers, "Requesting raw input");
                    self.trace.on_step(&format!("Waiting for input: {}", message));
                    request.input =
                        cancellable(self.cancel, operator.request_raw_input(&message)).await?;
                }
                Some(reply) => {
                    info!(
                        node_id = %node.id,
                        attempt = answers,
                        "Requesting additional information"
                    );
                    self.trace.on_step(&format!("Additional information needed: {}", message));
                    let value =
                        cancellable(self.cancel, operator.request_additional_info(&message)).await?;
                    let previous = std::mem::replace(&mut request.input, value);
                    request.history.push(ChatMessage::user(previous));
                    request.history.push(ChatMessage::assistant(reply));
                }
            }
            debug!(node_id = %node.id, history = request.history.len(), "Resuming node");
        }
    }
}

fn wrap_handler_error(node: &str, e: GreyflowError) -> GreyflowError {
    if e.is_structural() || e.is_cancelled() {
        e
    } else {
        GreyflowError::node_failed(node, &e)
    }
}
