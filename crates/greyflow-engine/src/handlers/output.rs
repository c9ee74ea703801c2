use futures::future::BoxFuture;

use greyflow_core::error::Result;
use greyflow_core::traits::ExecutionObserver;
use greyflow_core::types::Node;

use crate::dispatcher::{NodeHandler, NodeRequest, NodeResponse};

pub struct OutputHandler;

impl NodeHandler for OutputHandler {
    fn execute<'a>(
        &'a self,
        _node: &'a Node,
        request: &'a NodeRequest,
        trace: &'a dyn ExecutionObserver,
    ) -> BoxFuture<'a, Result<NodeResponse>> {
        Box::pin(async move {
            trace.on_step("Output agent formatting result");
            Ok(NodeResponse::Complete(request.input.clone()))
        })
    }
}
