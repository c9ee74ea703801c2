use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use greyflow_core::config::HttpConfig;
use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::HttpCaller;
use greyflow_core::types::{ApiConfig, HttpMethod};

use crate::format::render_body;
use crate::template::{build_body, build_headers, build_url, substitute_params};

/// reqwest-backed caller for `api` nodes.
pub struct ApiCaller {
    http: Client,
}

impl ApiCaller {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GreyflowError::HttpRequest(e.to_string()))?;
        Ok(Self { http })
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl HttpCaller for ApiCaller {
    fn call(
        &self,
        endpoint: &str,
        input: &str,
        config: &ApiConfig,
    ) -> BoxFuture<'_, Result<String>> {
        let endpoint = endpoint.to_string();
        let input = input.to_string();
        let config = config.clone();

        Box::pin(async move {
            // Query params only ride along on GET, matching the editor's behaviour.
            let query = if config.method == HttpMethod::Get {
                substitute_params(&config.query_params, &input)
            } else {
                Default::default()
            };
            let url = build_url(&endpoint, &input, &query)?;
            let headers = build_headers(&config);
            let body = build_body(&config, &input);

            debug!(method = %config.method, url = %url, has_body = body.is_some(), "Calling API");

            let mut req = self.http.request(to_reqwest(config.method), &url);
            for (k, v) in &headers {
                req = req.header(k.as_str(), v.as_str());
            }
            if let Some(body) = body {
                req = req.body(body);
            }

            let resp = req.send().await.map_err(|e| {
                if e.is_connect() {
                    GreyflowError::HttpRequest(format!(
                        "Network error: Unable to connect to {}",
                        endpoint
                    ))
                } else {
                    GreyflowError::HttpRequest(e.to_string())
                }
            })?;

            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|e| GreyflowError::HttpRequest(e.to_string()))?;

            if !status.is_success() {
                return Err(GreyflowError::HttpRequest(format!(
                    "API request failed ({}): {}",
                    status.as_u16(),
                    text
                )));
            }

            Ok(render_body(&text))
        })
    }
}
