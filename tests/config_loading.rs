use std::io::Write;

use greyflow_core::config::AppConfig;
use greyflow_core::GreyflowError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[engine]
max_interactive_retries = 3
max_pass_factor = 8

[model]
endpoint = "http://localhost:11434/v1/chat/completions"
model = "llama3.2"
api_key = "sk-test-key"
timeout_secs = 30

[model.retry]
max_retries = 5
initial_backoff_ms = 200

[http]
timeout_secs = 10
user_agent = "greyflow-ci"

[documents]
output_dir = "/tmp/greyflow-docs"
structure_with_llm = false
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.max_interactive_retries, 3);
    assert_eq!(config.engine.max_pass_factor, 8);
    assert_eq!(config.model.endpoint, "http://localhost:11434/v1/chat/completions");
    assert_eq!(config.model.model, "llama3.2");
    assert_eq!(config.model.api_key, Some("sk-test-key".to_string()));
    assert_eq!(config.model.timeout_secs, 30);

    let retry = config.model.retry.as_ref().expect("retry present");
    assert_eq!(retry.max_retries, 5);
    assert_eq!(retry.initial_backoff_ms, 200);
    assert_eq!(retry.max_backoff_ms, 30000);

    assert_eq!(config.http.timeout_secs, 10);
    assert_eq!(config.http.user_agent, "greyflow-ci");
    assert_eq!(config.output_dir(), std::path::PathBuf::from("/tmp/greyflow-docs"));
    assert!(!config.documents.structure_with_llm);
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("GREYFLOW_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[model]
api_key = "${GREYFLOW_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.model.api_key, Some("expanded-key-value".to_string()));

    std::env::remove_var("GREYFLOW_TEST_API_KEY");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[model]
model = "gpt-4o-mini"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.model, "gpt-4o-mini");
    assert_eq!(config.engine.max_interactive_retries, 10);
    assert_eq!(config.engine.max_pass_factor, 5);
    assert!(config.model.retry.is_none());
    assert!(config.model.api_key.is_none());
    assert_eq!(config.http.timeout_secs, 30);
    assert!(config.documents.structure_with_llm);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        AppConfig::load(&path),
        Err(GreyflowError::ConfigNotFound(_))
    ));
    let config = AppConfig::load_or_default(&path).expect("defaults");
    assert_eq!(config.model.model, "gpt-4o");
}

#[test]
fn test_malformed_config_is_an_error() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[engine]\nmax_pass_factor = \"lots\"\n").expect("write toml");

    assert!(matches!(
        AppConfig::load_or_default(tmp.path()),
        Err(GreyflowError::Config(_))
    ));
}
