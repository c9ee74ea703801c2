use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GreyflowError, Result};
use crate::types::{Edge, Graph, Node};

pub const FORMAT_TAG: &str = "GreyFlow";
pub const FORMAT_VERSION: &str = "1.0";
pub const FILE_EXTENSION: &str = "gre";

/// A saved workflow as written by the editor's export and local save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    #[serde(default = "default_name")]
    pub name: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

fn default_name() -> String {
    "Untitled Workflow".to_string()
}

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

fn default_format() -> String {
    FORMAT_TAG.to_string()
}

impl WorkflowDocument {
    pub fn new(name: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            nodes: graph.nodes,
            edges: graph.edges,
            version: default_version(),
            format: default_format(),
            last_saved: None,
            exported_at: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        if doc.format != FORMAT_TAG {
            tracing::warn!(format = %doc.format, "Unexpected workflow format tag");
        }
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            GreyflowError::Json(e) => {
                GreyflowError::InvalidWorkflow(format!("{}: {}", path.display(), e))
            }
            other => other,
        })
    }

    /// Pretty JSON stamped with `exportedAt`.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut doc = self.clone();
        doc.exported_at = Some(Utc::now());
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn graph(&self) -> Graph {
        Graph::new(self.nodes.clone(), self.edges.clone())
    }

    pub fn into_graph(self) -> Graph {
        Graph::new(self.nodes, self.edges)
    }

    /// `My Flow!` becomes `my_flow_.gre`.
    pub fn export_filename(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("{}.{}", stem, FILE_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    const SAVED: &str = r#"{
        "name": "Research Flow",
        "nodes": [
            {"id": "input-1", "type": "input", "position": {"x": 0, "y": 0},
             "data": {"label": "Topic", "prompt": "What should I research?"}},
            {"id": "processor-1", "type": "processor",
             "data": {"label": "Writer", "systemPrompt": "Write an essay.", "model": "gpt-4o"}},
            {"id": "pdf-1", "type": "pdf",
             "data": {"label": "Export", "pdfConfig": {"filename": "essay.pdf", "documentType": "research"}}}
        ],
        "edges": [
            {"id": "e1", "source": "input-1", "target": "processor-1", "animated": true},
            {"source": "processor-1", "target": "pdf-1"}
        ],
        "version": "1.0",
        "format": "GreyFlow",
        "lastSaved": "2024-05-01T12:00:00Z"
    }"#;

    #[test]
    fn loads_editor_document() {
        let doc = WorkflowDocument::from_json(SAVED).unwrap();
        assert_eq!(doc.name, "Research Flow");
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[2].kind, NodeKind::Pdf);
        assert_eq!(doc.nodes[0].data.prompt.as_deref(), Some("What should I research?"));
        assert_eq!(doc.edges[1].id, None);
        assert!(doc.last_saved.is_some());

        let graph = doc.into_graph();
        assert_eq!(graph.inbound("pdf-1").count(), 1);
    }

    #[test]
    fn minimal_document_gets_defaults() {
        let doc = WorkflowDocument::from_json(r#"{"nodes": []}"#).unwrap();
        assert_eq!(doc.format, "GreyFlow");
        assert_eq!(doc.version, "1.0");
        assert!(doc.edges.is_empty());
    }

    #[test]
    fn export_stamps_time_and_keeps_shape() {
        let doc = WorkflowDocument::from_json(SAVED).unwrap();
        let json = doc.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("exportedAt").is_some());
        assert_eq!(value["nodes"][1]["data"]["systemPrompt"], "Write an essay.");
        assert_eq!(value["format"], "GreyFlow");
    }

    #[test]
    fn export_filename_sanitises_name() {
        let doc = WorkflowDocument::new("My Flow v2!", Graph::default());
        assert_eq!(doc.export_filename(), "my_flow_v2_.gre");
    }

    #[test]
    fn load_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gre");
        std::fs::write(&path, "{ not json").unwrap();
        let err = WorkflowDocument::load(&path).unwrap_err();
        assert!(matches!(err, GreyflowError::InvalidWorkflow(_)));
    }
}
