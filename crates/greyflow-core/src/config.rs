use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GreyflowError, Result};

/// Top-level Greyflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

/// Scheduling and interactive-resolution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Operator requests allowed per node before the run fails.
    #[serde(default = "default_max_interactive_retries")]
    pub max_interactive_retries: u32,
    /// Scheduler passes allowed per node (`node_count * factor`).
    #[serde(default = "default_max_pass_factor")]
    pub max_pass_factor: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_interactive_retries: default_max_interactive_retries(),
            max_pass_factor: default_max_pass_factor(),
        }
    }
}

fn default_max_interactive_retries() -> u32 { 10 }
fn default_max_pass_factor() -> usize { 5 }

/// Default text-generation collaborator used by processor nodes
/// that do not carry their own endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_id")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            model: default_model_id(),
            api_key: None,
            timeout_secs: default_model_timeout(),
            retry: None,
        }
    }
}

fn default_model_endpoint() -> String { "https://grey-api.vercel.app/api/chat".to_string() }
fn default_model_id() -> String { "gpt-4o".to_string() }
fn default_model_timeout() -> u64 { 120 }

/// Retry configuration for text-generation requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Settings for the generic HTTP caller behind `api` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("greyflow/{}", env!("CARGO_PKG_VERSION")) }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory rendered PDF / Word files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Ask the text generator to split content into sections before
    /// falling back to the markdown heuristic.
    #[serde(default = "default_structure_with_llm")]
    pub structure_with_llm: bool,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            structure_with_llm: default_structure_with_llm(),
        }
    }
}

fn default_output_dir() -> String { ".".to_string() }
fn default_structure_with_llm() -> bool { true }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| GreyflowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| GreyflowError::Config(e.to_string()))
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(GreyflowError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Resolve the document output directory (expand ~).
    pub fn output_dir(&self) -> PathBuf {
        let dir = &self.documents.output_dir;
        if let Some(rest) = dir.strip_prefix("~/") {
            if let Some(home) = dirs_home() {
                return home.join(rest);
            }
        }
        PathBuf::from(dir)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_GREYFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_GREYFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_GREYFLOW_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_GREYFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_GREYFLOW_VAR}\"");
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_interactive_retries, 10);
        assert_eq!(config.engine.max_pass_factor, 5);
        assert_eq!(config.model.model, "gpt-4o");
        assert!(config.model.api_key.is_none());
        assert!(config.model.retry.is_none());
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.documents.structure_with_llm);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml_str = r#"
[engine]
max_interactive_retries = 3

[model]
endpoint = "http://localhost:8080/chat"

[model.retry]
max_retries = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.max_interactive_retries, 3);
        assert_eq!(config.engine.max_pass_factor, 5);
        assert_eq!(config.model.endpoint, "http://localhost:8080/chat");
        assert_eq!(config.model.model, "gpt-4o");
        let retry = config.model.retry.unwrap();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_backoff_ms, 1000);
    }

    #[test]
    fn test_output_dir_expands_home() {
        std::env::set_var("HOME", "/home/tester");
        let mut config = AppConfig::default();
        config.documents.output_dir = "~/docs".into();
        assert_eq!(config.output_dir(), PathBuf::from("/home/tester/docs"));
    }
}
