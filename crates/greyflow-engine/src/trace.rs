use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use greyflow_core::traits::ExecutionObserver;
use greyflow_core::types::NodeStatus;

/// Truncate `text` to at most `max` characters, marking the cut with `...`.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Forwards trace lines and status changes to the run's observer and
/// remembers the last status of every node it touched.
pub struct Reporter {
    observer: Arc<dyn ExecutionObserver>,
    statuses: Mutex<HashMap<String, NodeStatus>>,
}

impl Reporter {
    pub fn new(observer: Arc<dyn ExecutionObserver>) -> Self {
        Self {
            observer,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    pub fn step(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        debug!(step = %line, "Trace");
        self.observer.on_step(line);
    }

    pub fn status(&self, node_id: &str, status: NodeStatus) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(node_id.to_string(), status);
        }
        self.observer.on_status_change(node_id, status);
    }

    pub fn status_of(&self, node_id: &str) -> NodeStatus {
        self.statuses
            .lock()
            .ok()
            .and_then(|s| s.get(node_id).copied())
            .unwrap_or_default()
    }

    /// Report `Idle` for every node that left the idle state, in id order.
    pub fn reset_touched(&self) -> usize {
        let mut touched: Vec<String> = match self.statuses.lock() {
            Ok(statuses) => statuses
                .iter()
                .filter(|(_, s)| **s != NodeStatus::Idle)
                .map(|(id, _)| id.clone())
                .collect(),
            Err(_) => return 0,
        };
        touched.sort();
        for id in &touched {
            self.status(id, NodeStatus::Idle);
        }
        touched.len()
    }
}

/// Lets handlers write trace lines through the same reporter.
impl ExecutionObserver for Reporter {
    fn on_step(&self, line: &str) {
        self.step(line);
    }

    fn on_status_change(&self, node_id: &str, status: NodeStatus) {
        self.status(node_id, status);
    }
}
