use crate::traits::ExecutionObserver;
use crate::types::{NodeStatus, WorkflowEvent};

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: WorkflowEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ExecutionObserver for EventBus {
    fn on_step(&self, line: &str) {
        self.publish(WorkflowEvent::Step(line.to_string()));
    }

    fn on_status_change(&self, node_id: &str, status: NodeStatus) {
        self.publish(WorkflowEvent::StatusChanged {
            node_id: node_id.to_string(),
            status,
        });
    }
}
