use thiserror::Error;

#[derive(Debug, Error)]
pub enum GreyflowError {
    // Structural errors
    #[error("Workflow is empty. Please add at least one agent.")]
    EmptyWorkflow,

    #[error("Workflow has circular dependencies or disconnected nodes: {}", .nodes.join(", "))]
    UnresolvedNodes { nodes: Vec<String> },

    #[error("Unknown agent type: {kind} (node {node})")]
    UnknownNodeKind { node: String, kind: String },

    // Execution errors
    #[error("Failed to execute node {node}: {message}")]
    NodeFailed { node: String, message: String },

    #[error("Max retries exceeded for node {node} after {attempts} attempts")]
    MaxRetriesExceeded { node: String, attempts: u32 },

    #[error("Node {node} needs operator input but no operator is attached")]
    OperatorUnavailable { node: String },

    #[error("Workflow cancelled")]
    Cancelled,

    /// A node is missing configuration its handler needs.
    #[error("{0}")]
    NodeConfig(String),

    // Collaborator errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("Document generation failed: {0}")]
    Document(String),

    #[error("Operator channel error: {0}")]
    Operator(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid workflow document: {0}")]
    InvalidWorkflow(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GreyflowError {
    /// Wrap a handler-level failure so the message names the failing node.
    pub fn node_failed(node: impl Into<String>, source: &GreyflowError) -> Self {
        Self::NodeFailed {
            node: node.into(),
            message: source.to_string(),
        }
    }

    /// Errors that come from the shape of the graph rather than from running a node.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::EmptyWorkflow | Self::UnresolvedNodes { .. } | Self::UnknownNodeKind { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, GreyflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_message_names_nodes() {
        let err = GreyflowError::UnresolvedNodes {
            nodes: vec!["A".into(), "B".into()],
        };
        assert_eq!(
            err.to_string(),
            "Workflow has circular dependencies or disconnected nodes: A, B"
        );
        assert!(err.is_structural());
    }

    #[test]
    fn node_failed_wraps_source_message() {
        let inner = GreyflowError::HttpRequest("API request failed (500): boom".into());
        let err = GreyflowError::node_failed("Weather API", &inner);
        assert_eq!(
            err.to_string(),
            "Failed to execute node Weather API: HTTP request failed: API request failed (500): boom"
        );
        assert!(!err.is_structural());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn cancelled_is_distinguishable() {
        assert!(GreyflowError::Cancelled.is_cancelled());
        assert!(!GreyflowError::EmptyWorkflow.is_cancelled());
    }
}
