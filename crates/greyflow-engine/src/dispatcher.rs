use std::sync::Arc;

use futures::future::BoxFuture;

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::*;
use greyflow_core::types::{ChatMessage, Node, NodeKind};

use crate::handlers::{ApiHandler, DocumentHandler, InputHandler, OutputHandler, ProcessorHandler};

/// External services the node handlers call out to.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub http: Arc<dyn HttpCaller>,
    pub structurer: Arc<dyn DocumentStructurer>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

/// What a handler receives for one invocation.
#[derive(Debug, Clone, Default)]
pub struct NodeRequest {
    pub input: String,
    /// Prior exchanges of an interactive resolution, oldest first.
    pub history: Vec<ChatMessage>,
}

impl NodeRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            history: Vec::new(),
        }
    }
}

/// How a handler invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeResponse {
    Complete(String),
    /// The node has nothing to work with and needs a raw value.
    NeedsInput { prompt: String },
    /// The model asked for more information before it can finish.
    NeedsMoreInfo { request: String, reply: String },
}

/// One implementation per node kind.
pub trait NodeHandler: Send + Sync {
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        request: &'a NodeRequest,
        trace: &'a dyn ExecutionObserver,
    ) -> BoxFuture<'a, Result<NodeResponse>>;
}

/// Routes a node to the handler for its kind.
pub struct NodeDispatcher {
    input: InputHandler,
    processor: ProcessorHandler,
    api: ApiHandler,
    output: OutputHandler,
    document: DocumentHandler,
}

impl NodeDispatcher {
    pub fn new(collaborators: Collaborators, default_endpoint: impl Into<String>) -> Self {
        Self {
            input: InputHandler,
            processor: ProcessorHandler::new(collaborators.generator.clone(), default_endpoint),
            api: ApiHandler::new(collaborators.http.clone()),
            output: OutputHandler,
            document: DocumentHandler::new(collaborators.structurer, collaborators.renderer),
        }
    }

    /// Handler for `kind`, or `UnknownNodeKind` naming `node`.
    pub fn handler_for(&self, node: &Node, kind: &NodeKind) -> Result<&dyn NodeHandler> {
        Ok(match kind {
            NodeKind::Input => &self.input,
            NodeKind::Processor => &self.processor,
            NodeKind::Api => &self.api,
            NodeKind::Output => &self.output,
            NodeKind::Pdf | NodeKind::Word => &self.document,
            NodeKind::Unknown(tag) => {
                return Err(GreyflowError::UnknownNodeKind {
                    node: node.display_name().to_string(),
                    kind: tag.clone(),
                })
            }
        })
    }

    pub async fn dispatch(
        &self,
        node: &Node,
        kind: &NodeKind,
        request: &NodeRequest,
        trace: &dyn ExecutionObserver,
    ) -> Result<NodeResponse> {
        self.handler_for(node, kind)?
            .execute(node, request, trace)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_core::traits::NullObserver;
    use greyflow_test_utils::*;

    fn dispatcher() -> NodeDispatcher {
        NodeDispatcher::new(
            Collaborators {
                generator: Arc::new(ScriptedGenerator::new()),
                http: Arc::new(StubHttpCaller::new()),
                structurer: Arc::new(StaticStructurer),
                renderer: Arc::new(RecordingRenderer::new()),
            },
            "http://llm.local/chat",
        )
    }

    #[tokio::test]
    async fn unknown_kind_names_node_and_tag() {
        let node = Node::new("x", "telepathy").with_label("Mind Reader");
        let err = dispatcher()
            .dispatch(&node, &node.kind, &NodeRequest::new("hi"), &NullObserver)
            .await
            .unwrap_err();
        match err {
            GreyflowError::UnknownNodeKind { node, kind } => {
                assert_eq!(node, "Mind Reader");
                assert_eq!(kind, "telepathy");
            }
            other => panic!("expected UnknownNodeKind, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn kind_override_routes_to_input_handler() {
        let node = Node::new("p", "processor");
        let resp = dispatcher()
            .dispatch(&node, &NodeKind::Input, &NodeRequest::new("raw"), &NullObserver)
            .await
            .unwrap();
        assert_eq!(resp, NodeResponse::Complete("raw".into()));
    }
}
