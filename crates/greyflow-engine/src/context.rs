use std::time::Instant;

use greyflow_core::types::{Graph, NodeKind};

use crate::scheduler::{self, ResultsTable};

/// Result of one node, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeResult {
    pub node_id: String,
    pub output: String,
    pub elapsed_ms: u64,
    /// Operator round-trips the node needed before it completed.
    pub interactions: u32,
}

/// Per-run mutable state. Created fresh for every execution and threaded
/// through the scheduler loop by reference.
pub struct ExecutionContext {
    pub starting_input: String,
    results: ResultsTable,
    node_results: Vec<NodeResult>,
    /// Id of the node dispatched as `input` when the graph declares none.
    fallback_input: Option<String>,
    started: Instant,
}

impl ExecutionContext {
    pub fn new(graph: &Graph, starting_input: impl Into<String>) -> Self {
        let has_input = graph.nodes.iter().any(|n| n.kind == NodeKind::Input);
        Self {
            starting_input: starting_input.into(),
            results: ResultsTable::new(),
            node_results: Vec::new(),
            fallback_input: if has_input {
                None
            } else {
                graph.nodes.first().map(|n| n.id.clone())
            },
            started: Instant::now(),
        }
    }

    pub fn results(&self) -> &ResultsTable {
        &self.results
    }

    pub fn fallback_input(&self) -> Option<&str> {
        self.fallback_input.as_deref()
    }

    /// Kind the node is dispatched as.
    pub fn effective_kind<'a>(
        &self,
        id: &str,
        declared: &'a NodeKind,
    ) -> std::borrow::Cow<'a, NodeKind> {
        if self.fallback_input.as_deref() == Some(id) {
            std::borrow::Cow::Owned(NodeKind::Input)
        } else {
            std::borrow::Cow::Borrowed(declared)
        }
    }

    pub fn resolve_input(&self, graph: &Graph, id: &str) -> String {
        scheduler::resolve_input(graph, id, &self.results, &self.starting_input)
    }

    /// Record a finished node. A node's result is written once.
    pub fn record(&mut self, result: NodeResult) {
        if self.results.contains_key(&result.node_id) {
            return;
        }
        self.results.insert(result.node_id.clone(), result.output.clone());
        self.node_results.push(result);
    }

    pub fn result(&self, id: &str) -> Option<&str> {
        self.results.get(id).map(String::as_str)
    }

    pub fn processing_order(&self) -> Vec<String> {
        self.node_results.iter().map(|r| r.node_id.clone()).collect()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn into_node_results(self) -> Vec<NodeResult> {
        self.node_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_test_utils::fixtures::graph;

    fn result(id: &str, output: &str) -> NodeResult {
        NodeResult {
            node_id: id.into(),
            output: output.into(),
            elapsed_ms: 0,
            interactions: 0,
        }
    }

    #[test]
    fn results_are_written_once() {
        let g = graph(&[("a", "input")], &[]);
        let mut ctx = ExecutionContext::new(&g, "start");
        ctx.record(result("a", "first"));
        ctx.record(result("a", "second"));
        assert_eq!(ctx.result("a"), Some("first"));
        assert_eq!(ctx.processing_order(), vec!["a"]);
    }

    #[test]
    fn first_node_is_fallback_without_input_kind() {
        let g = graph(&[("p", "processor"), ("o", "output")], &[("p", "o")]);
        let ctx = ExecutionContext::new(&g, "");
        assert_eq!(ctx.fallback_input(), Some("p"));
        assert_eq!(*ctx.effective_kind("p", &NodeKind::Processor), NodeKind::Input);
        assert_eq!(*ctx.effective_kind("o", &NodeKind::Output), NodeKind::Output);
    }

    #[test]
    fn no_fallback_when_input_declared() {
        let graph = greyflow_test_utils::fixtures::input_processor_output();
        let ctx = ExecutionContext::new(&graph, "");
        assert_eq!(ctx.fallback_input(), None);
    }
}
