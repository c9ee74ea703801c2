use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use greyflow_core::config::ModelConfig;
use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::TextGenerator;
use greyflow_core::types::*;

const DEFAULT_MODEL: &str = "gpt-4o";

/// Chat-completion client for OpenAI-compatible and simple proxy endpoints.
///
/// One non-streaming POST per call. The reply is pulled out of whichever of
/// the common response shapes the endpoint uses.
pub struct ChatClient {
    http: Client,
    api_key: Option<String>,
    default_model: String,
}

impl ChatClient {
    pub fn new(config: &ModelConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
        }
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new(&ModelConfig::default())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

pub(crate) fn build_messages(
    messages: Vec<ChatMessage>,
    system_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    match system_prompt {
        Some(prompt) if !prompt.is_empty() => {
            let mut all = Vec::with_capacity(messages.len() + 1);
            all.push(ChatMessage::system(prompt));
            all.extend(messages);
            all
        }
        _ => messages,
    }
}

/// Pull the error message out of a failed response body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            if let Some(reason) = json.get("reason").filter(|v| !v.is_null()) {
                return value_text(reason);
            }
            match json.get("error") {
                Some(Value::String(s)) => s.clone(),
                _ => body.to_string(),
            }
        }
        Err(_) => body.to_string(),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Extract reply text from the response shapes seen in the wild, in order:
/// `choices[0].message.content`, `choices[0].text`, `message` (string or
/// `{content}`), `content`, `response`, `text`, or a bare JSON string.
pub(crate) fn extract_reply(data: &Value) -> Result<String> {
    if let Some(choice) = data.get("choices").and_then(|c| c.get(0)) {
        if let Some(text) = non_empty_str(choice.get("message").and_then(|m| m.get("content"))) {
            return Ok(text);
        }
        if let Some(text) = non_empty_str(choice.get("text")) {
            return Ok(text);
        }
    }

    match data.get("message") {
        Some(Value::String(s)) if !s.is_empty() => return Ok(s.clone()),
        Some(msg) => {
            if let Some(text) = non_empty_str(msg.get("content")) {
                return Ok(text);
            }
        }
        None => {}
    }

    for key in ["content", "response", "text"] {
        if let Some(text) = non_empty_str(data.get(key)) {
            return Ok(text);
        }
    }

    if let Value::String(s) = data {
        return Ok(s.clone());
    }

    Err(GreyflowError::LlmParse(format!(
        "Unexpected API response format. The API returned: {}",
        data
    )))
}

impl TextGenerator for ChatClient {
    fn generate(
        &self,
        endpoint: &str,
        messages: Vec<ChatMessage>,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> BoxFuture<'_, Result<String>> {
        let endpoint = endpoint.to_string();
        let messages = build_messages(messages, system_prompt);
        let model = model
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if self.default_model.is_empty() {
                    DEFAULT_MODEL.to_string()
                } else {
                    self.default_model.clone()
                }
            });

        Box::pin(async move {
            debug!(
                endpoint = %endpoint,
                model = %model,
                messages = messages.len(),
                "Sending chat request"
            );

            let body = ChatRequest {
                model: &model,
                messages,
            };
            let mut req = self.http.post(&endpoint).json(&body);
            if let Some(api_key) = &self.api_key {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }

            let response = req.send().await.map_err(|e| {
                if e.is_connect() {
                    GreyflowError::LlmRequest(format!(
                        "Network error: Unable to connect to {}",
                        endpoint
                    ))
                } else {
                    GreyflowError::LlmRequest(e.to_string())
                }
            })?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| GreyflowError::LlmRequest(e.to_string()))?;

            if !status.is_success() {
                warn!(status = status.as_u16(), "Chat endpoint returned an error");
                return Err(GreyflowError::LlmRequest(format!(
                    "API request failed ({}): {}",
                    status.as_u16(),
                    error_message(&text)
                )));
            }

            let data: Value = serde_json::from_str(&text)
                .map_err(|e| GreyflowError::LlmParse(format!("{}: {}", e, text)))?;
            extract_reply(&data)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_prompt_leads_the_conversation() {
        let msgs = build_messages(vec![ChatMessage::user("hi")], Some("be brief"));
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[0].content, "be brief");
        assert_eq!(msgs[1].role, Role::User);

        let plain = build_messages(vec![ChatMessage::user("hi")], None);
        assert_eq!(plain.len(), 1);
    }

    #[test]
    fn extracts_openai_shape() {
        let data = json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]});
        assert_eq!(extract_reply(&data).unwrap(), "hello");
    }

    #[test]
    fn extracts_completion_text_shape() {
        let data = json!({"choices": [{"text": "legacy"}]});
        assert_eq!(extract_reply(&data).unwrap(), "legacy");
    }

    #[test]
    fn extracts_message_variants() {
        assert_eq!(extract_reply(&json!({"message": "direct"})).unwrap(), "direct");
        assert_eq!(extract_reply(&json!({"message": {"content": "nested"}})).unwrap(), "nested");
    }

    #[test]
    fn extracts_flat_keys_in_order() {
        assert_eq!(extract_reply(&json!({"content": "c", "text": "t"})).unwrap(), "c");
        assert_eq!(extract_reply(&json!({"response": "r"})).unwrap(), "r");
        assert_eq!(extract_reply(&json!({"text": "t"})).unwrap(), "t");
        assert_eq!(extract_reply(&json!("bare")).unwrap(), "bare");
    }

    #[test]
    fn unknown_shape_is_a_parse_error() {
        let err = extract_reply(&json!({"foo": 1})).unwrap_err();
        assert!(matches!(err, GreyflowError::LlmParse(_)));
        assert!(err.to_string().contains("Unexpected API response format"));
    }

    #[test]
    fn error_message_prefers_reason_then_string_error() {
        assert_eq!(error_message(r#"{"reason": "quota"}"#), "quota");
        assert_eq!(error_message(r#"{"error": "bad key"}"#), "bad key");
        let nested = r#"{"error": {"code": 1}}"#;
        assert_eq!(error_message(nested), nested);
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }
}
