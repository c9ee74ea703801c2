use std::sync::Arc;

use futures::future::BoxFuture;

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::{ExecutionObserver, HttpCaller};
use greyflow_core::types::{ApiConfig, Node};

use crate::dispatcher::{NodeHandler, NodeRequest, NodeResponse};
use crate::trace::preview;

pub struct ApiHandler {
    http: Arc<dyn HttpCaller>,
}

impl ApiHandler {
    pub fn new(http: Arc<dyn HttpCaller>) -> Self {
        Self { http }
    }
}

impl NodeHandler for ApiHandler {
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        request: &'a NodeRequest,
        trace: &'a dyn ExecutionObserver,
    ) -> BoxFuture<'a, Result<NodeResponse>> {
        Box::pin(async move {
            let endpoint = node
                .data
                .api_endpoint
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| {
                    GreyflowError::NodeConfig("API endpoint is required for API agents".into())
                })?;
            let default_config = ApiConfig::default();
            let config = node.data.api_config.as_ref().unwrap_or(&default_config);

            trace.on_step(&format!("API agent calling: {}", endpoint));
            let result = self.http.call(endpoint, &request.input, config).await?;
            trace.on_step(&format!("API result: {}", preview(&result, 100)));
            Ok(NodeResponse::Complete(result))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_core::types::HttpMethod;
    use greyflow_test_utils::{RecordingObserver, StubHttpCaller};

    #[tokio::test]
    async fn missing_endpoint_is_config_error() {
        let http = StubHttpCaller::new();
        let err = ApiHandler::new(Arc::new(http.clone()))
            .execute(&Node::new("a", "api"), &NodeRequest::new("x"), &RecordingObserver::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API endpoint is required for API agents");
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn calls_with_default_get_config() {
        let http = StubHttpCaller::new();
        http.push_response("Temperature: 21");
        let obs = RecordingObserver::new();
        let node = Node::new("a", "api").with_endpoint("https://weather.local/{{input}}");
        let resp = ApiHandler::new(Arc::new(http.clone()))
            .execute(&node, &NodeRequest::new("Paris"), &obs)
            .await
            .unwrap();
        assert_eq!(resp, NodeResponse::Complete("Temperature: 21".into()));

        let calls = http.calls();
        let call = &calls[0];
        assert_eq!(call.endpoint, "https://weather.local/{{input}}");
        assert_eq!(call.input, "Paris");
        assert_eq!(call.config.method, HttpMethod::default());
        assert_eq!(
            obs.steps(),
            vec![
                "API agent calling: https://weather.local/{{input}}",
                "API result: Temperature: 21"
            ]
        );
    }

    #[tokio::test]
    async fn node_request_template_is_passed_through() {
        let http = StubHttpCaller::new();
        http.push_response("{\"id\": 7}");
        let config = ApiConfig {
            method: HttpMethod::Post,
            body_template: Some("{\"q\": \"{{input}}\"}".into()),
            ..ApiConfig::default()
        };
        let node = Node::new("a", "api")
            .with_endpoint("https://tickets.local")
            .with_api_config(config.clone());
        ApiHandler::new(Arc::new(http.clone()))
            .execute(&node, &NodeRequest::new("help"), &RecordingObserver::new())
            .await
            .unwrap();

        let calls = http.calls();
        assert_eq!(calls[0].config, config);
    }
}
