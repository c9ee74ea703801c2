use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::*;

/// Text generation: one chat completion per call.
pub trait TextGenerator: Send + Sync + 'static {
    /// Send `messages` (prefixed with `system_prompt` when given) to `endpoint`
    /// and return the reply text. Non-2xx responses are errors.
    fn generate(
        &self,
        endpoint: &str,
        messages: Vec<ChatMessage>,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> BoxFuture<'_, Result<String>>;
}

/// Generic HTTP caller behind `api` nodes.
pub trait HttpCaller: Send + Sync + 'static {
    /// Issue the templated request and return the normalised response text.
    fn call(
        &self,
        endpoint: &str,
        input: &str,
        config: &ApiConfig,
    ) -> BoxFuture<'_, Result<String>>;
}

/// Splits free text into typed document sections.
pub trait DocumentStructurer: Send + Sync + 'static {
    fn structure(
        &self,
        content: &str,
        document_type: DocumentType,
    ) -> BoxFuture<'_, Result<DocumentOutline>>;
}

/// Writes a structured document and returns a confirmation naming the file.
pub trait DocumentRenderer: Send + Sync + 'static {
    fn render(
        &self,
        outline: &DocumentOutline,
        format: DocumentFormat,
        document_type: DocumentType,
        filename: &str,
    ) -> BoxFuture<'_, Result<String>>;
}

/// Operator-facing channel used when a node cannot finish from its input alone.
pub trait OperatorChannel: Send + Sync + 'static {
    /// Ask for the raw value of an `input` node.
    fn request_raw_input(&self, prompt: &str) -> BoxFuture<'_, Result<String>>;

    /// Ask for supplementary information requested by a processor.
    fn request_additional_info(&self, request: &str) -> BoxFuture<'_, Result<String>>;
}

/// Progress sink. Calls are synchronous and must not block; an observer
/// can never abort a run.
pub trait ExecutionObserver: Send + Sync {
    /// One human-readable trace line, in execution order.
    fn on_step(&self, line: &str);

    fn on_status_change(&self, node_id: &str, status: NodeStatus);
}

/// Observer that drops everything.
pub struct NullObserver;

impl ExecutionObserver for NullObserver {
    fn on_step(&self, _line: &str) {}

    fn on_status_change(&self, _node_id: &str, _status: NodeStatus) {}
}
