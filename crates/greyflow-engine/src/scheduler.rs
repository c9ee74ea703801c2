//! Fixed-point readiness scheduling.
//!
//! Nodes are scanned in declaration order, pass after pass. A node is ready
//! once every edge targeting it has a source with a recorded result. Within
//! a pass, a node processed early can make a later node ready. Scheduling
//! stops when every node has a result, when a whole pass makes no progress,
//! or when the pass ceiling is reached.

use std::collections::HashMap;

use tracing::debug;

use greyflow_core::types::{Graph, Node};

/// Node id to resolved output.
pub type ResultsTable = HashMap<String, String>;

pub fn max_passes(node_count: usize, pass_factor: usize) -> usize {
    node_count.saturating_mul(pass_factor.max(1)).max(1)
}

/// Every inbound edge's source has a result. Nodes without inbound edges
/// are always ready.
pub fn is_ready(graph: &Graph, node_id: &str, results: &ResultsTable) -> bool {
    graph.inbound(node_id).all(|e| results.contains_key(&e.source))
}

/// Input for a ready node: the starting input when nothing feeds it,
/// otherwise upstream results in edge declaration order joined by a blank
/// line. Empty upstream results are skipped.
pub fn resolve_input(
    graph: &Graph,
    node_id: &str,
    results: &ResultsTable,
    starting_input: &str,
) -> String {
    let mut inbound = graph.inbound(node_id).peekable();
    if inbound.peek().is_none() {
        return starting_input.to_string();
    }
    inbound
        .filter_map(|e| results.get(&e.source))
        .filter(|r| !r.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Nodes still without a result, in declaration order.
pub fn unresolved<'g>(graph: &'g Graph, results: &ResultsTable) -> Vec<&'g Node> {
    graph
        .nodes
        .iter()
        .filter(|n| !results.contains_key(&n.id))
        .collect()
}

/// Cursor over ready nodes. The caller records each yielded node's result
/// before asking for the next one.
pub struct Scheduler<'g> {
    graph: &'g Graph,
    max_passes: usize,
    pass: usize,
    cursor: usize,
    in_pass: bool,
    progressed: bool,
}

impl<'g> Scheduler<'g> {
    pub fn new(graph: &'g Graph, pass_factor: usize) -> Self {
        Self {
            graph,
            max_passes: max_passes(graph.nodes.len(), pass_factor),
            pass: 0,
            cursor: 0,
            in_pass: false,
            progressed: false,
        }
    }

    /// Passes started so far.
    pub fn passes(&self) -> usize {
        self.pass
    }

    pub fn next_ready(&mut self, results: &ResultsTable) -> Option<&'g Node> {
        loop {
            if self.in_pass {
                while self.cursor < self.graph.nodes.len() {
                    let node = &self.graph.nodes[self.cursor];
                    self.cursor += 1;
                    if results.contains_key(&node.id) {
                        continue;
                    }
                    if is_ready(self.graph, &node.id, results) {
                        self.progressed = true;
                        return Some(node);
                    }
                }
                self.in_pass = false;
            }

            let done = self.graph.nodes.iter().all(|n| results.contains_key(&n.id));
            let stalled = self.pass > 0 && !self.progressed;
            if done || stalled || self.pass >= self.max_passes {
                debug!(passes = self.pass, done, stalled, "Scheduler finished");
                return None;
            }

            self.pass += 1;
            self.cursor = 0;
            self.progressed = false;
            self.in_pass = true;
            debug!(pass = self.pass, max_passes = self.max_passes, "Starting scheduler pass");
        }
    }
}

/// Outcome of scheduling a graph without running any handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub order: Vec<String>,
    pub unresolved: Vec<String>,
    pub passes: usize,
}

/// Dry-run the scheduler, pretending every node succeeds.
pub fn plan(graph: &Graph, pass_factor: usize) -> Plan {
    let mut results = ResultsTable::new();
    let mut order = Vec::new();
    let mut scheduler = Scheduler::new(graph, pass_factor);
    while let Some(node) = scheduler.next_ready(&results) {
        results.insert(node.id.clone(), String::new());
        order.push(node.id.clone());
    }
    Plan {
        order,
        unresolved: unresolved(graph, &results).into_iter().map(|n| n.id.clone()).collect(),
        passes: scheduler.passes(),
    }
}
