use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use greyflow_core::directive::Directive;
use greyflow_core::error::Result;
use greyflow_core::traits::{ExecutionObserver, TextGenerator};
use greyflow_core::types::{ChatMessage, Node};

use crate::dispatcher::{NodeHandler, NodeRequest, NodeResponse};
use crate::trace::preview;

/// Sends the input, plus any earlier exchanges, to the text generator and
/// classifies the reply by its directive prefix.
pub struct ProcessorHandler {
    generator: Arc<dyn TextGenerator>,
    default_endpoint: String,
}

impl ProcessorHandler {
    pub fn new(generator: Arc<dyn TextGenerator>, default_endpoint: impl Into<String>) -> Self {
        Self {
            generator,
            default_endpoint: default_endpoint.into(),
        }
    }

    fn endpoint<'a>(&'a self, node: &'a Node) -> &'a str {
        node.data
            .api_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&self.default_endpoint)
    }
}

impl NodeHandler for ProcessorHandler {
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        request: &'a NodeRequest,
        trace: &'a dyn ExecutionObserver,
    ) -> BoxFuture<'a, Result<NodeResponse>> {
        Box::pin(async move {
            let system_prompt = node.data.system_prompt.as_deref().filter(|p| !p.trim().is_empty());
            let model = node.data.model.as_deref().filter(|m| !m.trim().is_empty());
            trace.on_step(&format!(
                "Processor agent ({}) with system prompt: {}",
                model.unwrap_or("default"),
                preview(system_prompt.unwrap_or("none"), 100)
            ));

            let mut messages = request.history.clone();
            messages.push(ChatMessage::user(request.input.clone()));

            let reply = match self
                .generator
                .generate(self.endpoint(node), messages, system_prompt, model)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(node_id = %node.id, error = %e, "Processor generation failed");
                    trace.on_step(&format!("Processor agent failed: {}", e));
                    return Err(e);
                }
            };

            let response = match Directive::parse(&reply) {
                Directive::MissingInfo(request) | Directive::SectionComplete(request) => {
                    NodeResponse::NeedsMoreInfo { request, reply }
                }
                Directive::Complete(text) | Directive::PlainText(text) => {
                    trace.on_step(&format!("Processor result: {}", preview(&text, 100)));
                    NodeResponse::Complete(text)
                }
            };
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_core::error::GreyflowError;
    use greyflow_core::types::Role;
    use greyflow_test_utils::{RecordingObserver, ScriptedGenerator};

    fn handler(gen: &ScriptedGenerator) -> ProcessorHandler {
        ProcessorHandler::new(Arc::new(gen.clone()), "http://default/chat")
    }

    #[tokio::test]
    async fn sends_history_then_input() {
        let gen = ScriptedGenerator::with_replies(["answer"]);
        let node = Node::new("p", "processor").with_system_prompt("Be brief.");
        let request = NodeRequest {
            input: "second".into(),
            history: vec![
                ChatMessage::user("first"),
                ChatMessage::assistant("MISSING_INFO: more?"),
            ],
        };
        let resp = handler(&gen)
            .execute(&node, &request, &RecordingObserver::new())
            .await
            .unwrap();
        assert_eq!(resp, NodeResponse::Complete("answer".into()));

        let calls = gen.calls();
        let call = &calls[0];
        assert_eq!(call.endpoint, "http://default/chat");
        assert_eq!(call.system_prompt.as_deref(), Some("Be brief."));
        let roles: Vec<_> = call.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(call.messages[2].content, "second");
    }

    #[tokio::test]
    async fn node_endpoint_overrides_default() {
        let gen = ScriptedGenerator::new();
        let node = Node::new("p", "processor").with_endpoint("http://custom/chat");
        handler(&gen)
            .execute(&node, &NodeRequest::new("hi"), &RecordingObserver::new())
            .await
            .unwrap();
        assert_eq!(gen.calls()[0].endpoint, "http://custom/chat");
    }

    #[tokio::test]
    async fn directives_map_to_responses() {
        let gen = ScriptedGenerator::with_replies([
            "MISSING_INFO: your budget?",
            "SECTION_COMPLETE: part one",
            "COMPLETE: all done",
        ]);
        let h = handler(&gen);
        let node = Node::new("p", "processor");
        let obs = RecordingObserver::new();
        let req = NodeRequest::new("go");

        assert_eq!(
            h.execute(&node, &req, &obs).await.unwrap(),
            NodeResponse::NeedsMoreInfo {
                request: "your budget?".into(),
                reply: "MISSING_INFO: your budget?".into()
            }
        );
        assert!(matches!(
            h.execute(&node, &req, &obs).await.unwrap(),
            NodeResponse::NeedsMoreInfo { ref request, .. } if request == "part one"
        ));
        assert_eq!(
            h.execute(&node, &req, &obs).await.unwrap(),
            NodeResponse::Complete("all done".into())
        );
    }

    #[tokio::test]
    async fn failure_is_traced_and_returned() {
        let gen = ScriptedGenerator::new();
        gen.push_error(GreyflowError::LlmRequest("API request failed (500): down".into()));
        let obs = RecordingObserver::new();
        let err = handler(&gen)
            .execute(&Node::new("p", "processor"), &NodeRequest::new("x"), &obs)
            .await
            .unwrap_err();
        assert!(matches!(err, GreyflowError::LlmRequest(_)));
        assert!(obs.has_step_containing("Processor agent failed: LLM request failed"));
    }
}
