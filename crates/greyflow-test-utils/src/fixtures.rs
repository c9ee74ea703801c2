use greyflow_core::types::*;

pub fn node(id: &str, kind: &str) -> Node {
    Node::new(id, kind)
}

pub fn labelled(id: &str, kind: &str, label: &str) -> Node {
    Node::new(id, kind).with_label(label)
}

pub fn edge(source: &str, target: &str) -> Edge {
    Edge::new(source, target)
}

/// Build a graph from `(id, kind)` pairs and `(source, target)` pairs.
pub fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> Graph {
    Graph::new(
        nodes.iter().map(|(id, kind)| node(id, kind)).collect(),
        edges.iter().map(|(s, t)| edge(s, t)).collect(),
    )
}

/// `in1 -> p1 -> out1`.
pub fn input_processor_output() -> Graph {
    graph(
        &[("in1", "input"), ("p1", "processor"), ("out1", "output")],
        &[("in1", "p1"), ("p1", "out1")],
    )
}

/// Minimal saved-workflow JSON in the editor's format.
pub fn workflow_json() -> String {
    serde_json::json!({
        "name": "Echo Flow",
        "nodes": [
            {"id": "in1", "type": "input", "data": {"label": "Question"}},
            {"id": "p1", "type": "processor", "data": {"label": "Answer", "systemPrompt": "Reply briefly."}},
            {"id": "out1", "type": "output", "data": {"label": "Result"}}
        ],
        "edges": [
            {"id": "e1", "source": "in1", "target": "p1"},
            {"id": "e2", "source": "p1", "target": "out1"}
        ],
        "version": "1.0",
        "format": "GreyFlow"
    })
    .to_string()
}
