use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a node. Unrecognised tags are kept verbatim so a
/// workflow still loads and the failure surfaces when the node runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Input,
    #[default]
    Processor,
    Api,
    Output,
    Pdf,
    Word,
    Unknown(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Input => "input",
            Self::Processor => "processor",
            Self::Api => "api",
            Self::Output => "output",
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "input" => Self::Input,
            "processor" => Self::Processor,
            "api" => Self::Api,
            "output" => Self::Output,
            "pdf" => Self::Pdf,
            "word" => Self::Word,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas position. Carried through load/save, ignored by execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Methods that carry a request body.
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    None,
    Bearer,
    Apikey,
    Basic,
}

/// Request template for `api` nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,
}

/// Layout family for generated documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    General,
    Cv,
    Research,
    Report,
    Letter,
    Custom,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::General => "general",
            Self::Cv => "cv",
            Self::Research => "research",
            Self::Report => "report",
            Self::Letter => "letter",
            Self::Custom => "custom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub document_type: DocumentType,
}

/// Type-specific node configuration, in the editor's persisted shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Operator prompt shown by `input` nodes when no input was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_config: Option<DocumentConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_config: Option<DocumentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<NodeKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position: None,
            data: NodeData::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = label.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.data.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.data.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_config(mut self, config: ApiConfig) -> Self {
        self.data.api_config = Some(config);
        self
    }

    /// Label when set, id otherwise. Used in every user-facing message.
    pub fn display_name(&self) -> &str {
        if self.data.label.trim().is_empty() {
            &self.id
        } else {
            &self.data.label
        }
    }

    /// Document settings for `pdf`/`word` nodes.
    pub fn document_config(&self) -> Option<&DocumentConfig> {
        match self.kind {
            NodeKind::Pdf => self.data.pdf_config.as_ref(),
            NodeKind::Word => self.data.word_config.as_ref(),
            _ => None,
        }
    }
}

/// Directed data-flow link. Only `source` and `target` drive execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: Some(format!("e{}-{}", source, target)),
            source,
            target,
            animated: None,
        }
    }
}

/// The immutable value one execution runs against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges targeting `id`, in declaration order.
    pub fn inbound<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn has_outgoing(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.source == id)
    }

    /// Nodes with no outgoing edges, in declaration order.
    pub fn terminal_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !self.has_outgoing(&n.id))
    }
}

/// Per-node lifecycle as reported to observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Executing,
    Completed,
    Error,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat turn sent to the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Title,
    Heading,
    Subheading,
    Paragraph,
    List,
    Quote,
    Code,
}

/// One typed block of a structured document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default)]
    pub content: String,
    /// Entries of a `list` section.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

impl Section {
    pub fn new(kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            items: Vec::new(),
        }
    }

    pub fn list(items: Vec<String>) -> Self {
        Self {
            kind: SectionKind::List,
            content: String::new(),
            items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub word_count: usize,
}

/// Output of the structuring collaborator, input of the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub sections: Vec<Section>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Word,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "docx",
        }
    }
}

/// Events published on the [`crate::EventBus`] during a run.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Step(String),
    StatusChanged { node_id: String, status: NodeStatus },
    OperatorRequested {
        request_id: String,
        kind: OperatorRequestKind,
        message: String,
    },
    OperatorResolved { request_id: String },
    RunFinished { cancelled: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorRequestKind {
    RawInput,
    AdditionalInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_round_trips_unknown_tags() {
        let node: Node = serde_json::from_str(r#"{"id":"x","type":"telepathy"}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Unknown("telepathy".into()));
        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["type"], "telepathy");
    }

    #[test]
    fn missing_type_defaults_to_processor() {
        let node: Node =
            serde_json::from_str(r#"{"id":"x","data":{"label":"Summarise"}}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Processor);
        assert_eq!(node.display_name(), "Summarise");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let node = Node::new("n1", NodeKind::Output).with_label("  ");
        assert_eq!(node.display_name(), "n1");
    }

    #[test]
    fn api_config_uses_editor_field_names() {
        let json = r#"{
            "method": "POST",
            "headers": {"X-Trace": "1"},
            "queryParams": {"q": "{{input}}"},
            "bodyTemplate": "{\"text\":\"{{input}}\"}",
            "authType": "apikey",
            "authValue": "secret",
            "authHeader": "X-API-Key",
            "useCorsProxy": true
        }"#;
        let config: ApiConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.auth_type, AuthType::Apikey);
        assert_eq!(config.query_params["q"], "{{input}}");
        assert_eq!(config.auth_header.as_deref(), Some("X-API-Key"));
    }

    #[test]
    fn inbound_preserves_edge_declaration_order() {
        let graph = Graph::new(
            vec![Node::new("a", "input"), Node::new("b", "input"), Node::new("c", "output")],
            vec![Edge::new("b", "c"), Edge::new("a", "c")],
        );
        let sources: Vec<_> = graph.inbound("c").map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["b", "a"]);
        let terminals: Vec<_> = graph.terminal_nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(terminals, vec!["c"]);
    }

    #[test]
    fn document_config_follows_kind() {
        let mut node = Node::new("doc", NodeKind::Word);
        node.data.word_config = Some(DocumentConfig {
            filename: Some("cv.docx".into()),
            document_type: DocumentType::Cv,
        });
        node.data.pdf_config = Some(DocumentConfig::default());
        assert_eq!(node.document_config().unwrap().document_type, DocumentType::Cv);
    }
}
