use std::sync::Arc;

use futures::future::BoxFuture;

use greyflow_core::error::Result;
use greyflow_core::traits::{DocumentRenderer, DocumentStructurer, ExecutionObserver};
use greyflow_core::types::{DocumentFormat, Node, NodeKind};

use crate::dispatcher::{NodeHandler, NodeRequest, NodeResponse};

/// `pdf` and `word` nodes: structure the input, render it, and hand back the
/// renderer's confirmation.
pub struct DocumentHandler {
    structurer: Arc<dyn DocumentStructurer>,
    renderer: Arc<dyn DocumentRenderer>,
}

impl DocumentHandler {
    pub fn new(
        structurer: Arc<dyn DocumentStructurer>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            structurer,
            renderer,
        }
    }
}

impl NodeHandler for DocumentHandler {
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        request: &'a NodeRequest,
        trace: &'a dyn ExecutionObserver,
    ) -> BoxFuture<'a, Result<NodeResponse>> {
        Box::pin(async move {
            let format = match node.kind {
                NodeKind::Word => DocumentFormat::Word,
                _ => DocumentFormat::Pdf,
            };
            let config = node.document_config().cloned().unwrap_or_default();
            trace.on_step(&format!(
                "Generating {} document ({})",
                format.extension(),
                config.document_type
            ));

            let outline = self.structurer.structure(&request.input, config.document_type).await?;
            let confirmation = self
                .renderer
                .render(
                    &outline,
                    format,
                    config.document_type,
                    config.filename.as_deref().unwrap_or(""),
                )
                .await?;
            trace.on_step(&confirmation);
            Ok(NodeResponse::Complete(confirmation))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_core::types::{DocumentConfig, DocumentType};
    use greyflow_test_utils::{RecordingObserver, RecordingRenderer, StaticStructurer};

    #[tokio::test]
    async fn word_node_uses_its_config() {
        let renderer = RecordingRenderer::new();
        let mut node = Node::new("w", "word");
        node.data.word_config = Some(DocumentConfig {
            filename: Some("resume.docx".into()),
            document_type: DocumentType::Cv,
        });
        let resp = DocumentHandler::new(Arc::new(StaticStructurer), Arc::new(renderer.clone()))
            .execute(&node, &NodeRequest::new("Jane Doe"), &RecordingObserver::new())
            .await
            .unwrap();
        assert_eq!(resp, NodeResponse::Complete("Word document generated: resume.docx".into()));

        let calls = renderer.calls();
        let call = &calls[0];
        assert_eq!(call.format, DocumentFormat::Word);
        assert_eq!(call.document_type, DocumentType::Cv);
        assert_eq!(call.outline.sections[0].content, "Jane Doe");
    }

    #[tokio::test]
    async fn pdf_node_without_config_uses_defaults() {
        let renderer = RecordingRenderer::new();
        DocumentHandler::new(Arc::new(StaticStructurer), Arc::new(renderer.clone()))
            .execute(&Node::new("p", "pdf"), &NodeRequest::new("text"), &RecordingObserver::new())
            .await
            .unwrap();
        let calls = renderer.calls();
        let call = &calls[0];
        assert_eq!(call.format, DocumentFormat::Pdf);
        assert_eq!(call.document_type, DocumentType::General);
        assert_eq!(call.filename, "");
    }
}
