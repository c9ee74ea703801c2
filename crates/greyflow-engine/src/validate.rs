use std::collections::HashSet;
use std::fmt;

use greyflow_core::config::EngineConfig;
use greyflow_core::types::{Graph, NodeKind};

use crate::scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub node: Option<String>,
    pub message: String,
}

impl Issue {
    fn error(node: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            node: node.map(str::to_string),
            message: message.into(),
        }
    }

    fn warning(node: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            node: node.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.node {
            Some(node) => write!(f, "{}: {} ({})", level, self.message, node),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Static analysis of a graph: the order nodes would run in, the nodes that
/// would never become ready, and configuration problems found up front.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Node display names in processing order.
    pub order: Vec<String>,
    /// Display names of nodes the scheduler could not reach.
    pub unresolved: Vec<String>,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_runnable(&self) -> bool {
        self.unresolved.is_empty() && !self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

pub fn validate(graph: &Graph, config: &EngineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    if graph.is_empty() {
        report
            .issues
            .push(Issue::error(None, "Workflow is empty. Please add at least one agent."));
        return report;
    }

    let mut seen = HashSet::new();
    for node in &graph.nodes {
        let name = node.display_name();
        if !seen.insert(node.id.as_str()) {
            report.issues.push(Issue::error(Some(name), format!("duplicate node id {}", node.id)));
        }
        match &node.kind {
            NodeKind::Unknown(tag) => {
                report
                    .issues
                    .push(Issue::error(Some(name), format!("Unknown agent type: {}", tag)));
            }
            NodeKind::Api => {
                let missing = node
                    .data
                    .api_endpoint
                    .as_deref()
                    .map_or(true, |e| e.trim().is_empty());
                if missing {
                    report
                        .issues
                        .push(Issue::error(Some(name), "API endpoint is required for API agents"));
                }
            }
            _ => {}
        }
    }

    for edge in &graph.edges {
        for end in [&edge.source, &edge.target] {
            if graph.node(end).is_none() {
                report.issues.push(Issue::warning(
                    None,
                    format!(
                        "edge {} -> {} references missing node {}",
                        edge.source, edge.target, end
                    ),
                ));
            }
        }
    }

    if !graph.nodes.iter().any(|n| n.kind == NodeKind::Input) {
        report.issues.push(Issue::warning(
            graph.nodes.first().map(|n| n.display_name()),
            "No input node found, using first node as input",
        ));
    }

    let plan = scheduler::plan(graph, config.max_pass_factor);
    let name_of = |id: &String| {
        graph
            .node(id)
            .map(|n| n.display_name().to_string())
            .unwrap_or_else(|| id.clone())
    };
    report.order = plan.order.iter().map(name_of).collect();
    report.unresolved = plan.unresolved.iter().map(name_of).collect();
    report
}
