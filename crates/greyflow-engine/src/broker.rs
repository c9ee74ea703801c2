use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::debug;

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::event::EventBus;
use greyflow_core::traits::OperatorChannel;
use greyflow_core::types::{OperatorRequestKind, WorkflowEvent};

/// A question waiting on the operator.
#[derive(Debug, Clone)]
pub struct OperatorRequest {
    pub id: String,
    pub kind: OperatorRequestKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

type Pending = HashMap<String, (OperatorRequest, oneshot::Sender<String>)>;

/// In-process operator channel. Requests are published on the event bus and
/// resolved by whoever is listening (terminal prompt, tests).
///
/// A request awaited through [`OperatorChannel`] is withdrawn when its future
/// is dropped, so a cancelled run leaves nothing pending.
pub struct OperatorBroker {
    pending: Mutex<Pending>,
    event_bus: Arc<EventBus>,
}

/// Withdraws an unanswered request when the waiting future goes away.
struct PendingGuard<'a> {
    broker: &'a OperatorBroker,
    request_id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.broker.withdraw(&self.request_id) {
            debug!(request_id = %self.request_id, "Operator request abandoned");
        }
    }
}

impl OperatorBroker {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            event_bus,
        }
    }

    /// Register a request, publish it, return the receiver to await.
    pub async fn request(
        &self,
        kind: OperatorRequestKind,
        message: impl Into<String>,
    ) -> oneshot::Receiver<String> {
        self.register(kind, message.into()).1
    }

    fn register(
        &self,
        kind: OperatorRequestKind,
        message: String,
    ) -> (String, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        let req = OperatorRequest {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            message,
            created_at: Utc::now(),
        };
        let id = req.id.clone();

        // Register before publishing so a fast listener can respond.
        self.lock_pending().insert(id.clone(), (req.clone(), tx));
        self.event_bus.publish(WorkflowEvent::OperatorRequested {
            request_id: req.id,
            kind: req.kind,
            message: req.message,
        });
        (id, rx)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop a request without answering it. Returns true if it was pending.
    fn withdraw(&self, request_id: &str) -> bool {
        let removed = self.lock_pending().remove(request_id).is_some();
        if removed {
            self.event_bus.publish(WorkflowEvent::OperatorResolved {
                request_id: request_id.to_string(),
            });
        }
        removed
    }

    /// Resolve a pending request. Returns true if it was found.
    pub async fn respond(&self, request_id: &str, value: impl Into<String>) -> bool {
        let entry = self.lock_pending().remove(request_id);
        match entry {
            Some((_req, tx)) => {
                self.event_bus.publish(WorkflowEvent::OperatorResolved {
                    request_id: request_id.to_string(),
                });
                // Receiver may be gone if the run was cancelled
                let _ = tx.send(value.into());
                true
            }
            None => false,
        }
    }

    /// Resolve every pending request with an empty answer.
    pub async fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock_pending().drain().collect();
        let count = drained.len();
        for (id, (_req, tx)) in drained {
            self.event_bus.publish(WorkflowEvent::OperatorResolved { request_id: id });
            let _ = tx.send(String::new());
        }
        if count > 0 {
            debug!(count, "Cancelled pending operator requests");
        }
        count
    }

    pub async fn pending_requests(&self) -> Vec<OperatorRequest> {
        let mut requests: Vec<_> = self
            .lock_pending()
            .values()
            .map(|(req, _)| req.clone())
            .collect();
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    async fn ask(&self, kind: OperatorRequestKind, message: String) -> Result<String> {
        let (request_id, rx) = self.register(kind, message);
        let _guard = PendingGuard {
            broker: self,
            request_id,
        };
        rx.await
            .map_err(|_| GreyflowError::Operator("operator request was dropped".into()))
    }
}

impl OperatorChannel for OperatorBroker {
    fn request_raw_input(&self, prompt: &str) -> BoxFuture<'_, Result<String>> {
        let prompt = prompt.to_string();
        Box::pin(self.ask(OperatorRequestKind::RawInput, prompt))
    }

    fn request_additional_info(&self, request: &str) -> BoxFuture<'_, Result<String>> {
        let request = request.to_string();
        Box::pin(self.ask(OperatorRequestKind::AdditionalInfo, request))
    }
}
