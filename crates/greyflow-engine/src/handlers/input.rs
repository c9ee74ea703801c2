use futures::future::BoxFuture;

use greyflow_core::error::Result;
use greyflow_core::traits::ExecutionObserver;
use greyflow_core::types::Node;

use crate::dispatcher::{NodeHandler, NodeRequest, NodeResponse};
use crate::trace::preview;

/// Passes the starting input through. Asks the operator when it is blank.
pub struct InputHandler;

impl NodeHandler for InputHandler {
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        request: &'a NodeRequest,
        trace: &'a dyn ExecutionObserver,
    ) -> BoxFuture<'a, Result<NodeResponse>> {
        Box::pin(async move {
            if request.input.trim().is_empty() {
                let prompt = node
                    .data
                    .prompt
                    .clone()
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| format!("Please provide input for {}", node.display_name()));
                return Ok(NodeResponse::NeedsInput { prompt });
            }
            trace.on_step(&format!(
                "Input agent processing: \"{}\"",
                preview(&request.input, 50)
            ));
            Ok(NodeResponse::Complete(request.input.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_test_utils::RecordingObserver;

    #[tokio::test]
    async fn blank_input_asks_with_default_prompt() {
        let node = Node::new("in1", "input").with_label("Question");
        let resp = InputHandler
            .execute(&node, &NodeRequest::new("   "), &RecordingObserver::new())
            .await
            .unwrap();
        assert_eq!(
            resp,
            NodeResponse::NeedsInput {
                prompt: "Please provide input for Question".into()
            }
        );
    }

    #[tokio::test]
    async fn blank_input_uses_configured_prompt() {
        let mut node = Node::new("in1", "input");
        node.data.prompt = Some("What city?".into());
        let resp = InputHandler
            .execute(&node, &NodeRequest::new(""), &RecordingObserver::new())
            .await
            .unwrap();
        assert_eq!(
            resp,
            NodeResponse::NeedsInput {
                prompt: "What city?".into()
            }
        );
    }

    #[tokio::test]
    async fn passes_input_through_with_preview() {
        let obs = RecordingObserver::new();
        let long = "x".repeat(80);
        let resp = InputHandler
            .execute(&Node::new("in1", "input"), &NodeRequest::new(long.clone()), &obs)
            .await
            .unwrap();
        assert_eq!(resp, NodeResponse::Complete(long));
        assert_eq!(obs.steps(), vec![format!("Input agent processing: \"{}...\"", "x".repeat(50))]);
    }
}
