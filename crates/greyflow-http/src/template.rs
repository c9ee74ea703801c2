//! Request construction for `api` nodes: placeholder substitution, query
//! strings, auth headers and default bodies.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use base64::Engine;
use regex::Regex;

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::types::{ApiConfig, AuthType};

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Matches `{{input}}`, `{input}` and the lopsided `{{input}` / `{input}}`.
    RE.get_or_init(|| Regex::new(r"\{\{?input\}?\}").expect("placeholder pattern is valid"))
}

pub fn has_placeholder(template: &str) -> bool {
    placeholder().is_match(template)
}

/// Replace every input placeholder in `template` with `input` verbatim.
pub fn substitute(template: &str, input: &str) -> String {
    placeholder()
        .replace_all(template, regex::NoExpand(input))
        .into_owned()
}

/// Substitute query-parameter values, keeping keys.
pub fn substitute_params(
    params: &BTreeMap<String, String>,
    input: &str,
) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), substitute(v, input)))
        .collect()
}

/// Resolve the endpoint: placeholders are URL-encoded, then non-blank query
/// params are appended.
pub fn build_url(endpoint: &str, input: &str, query: &BTreeMap<String, String>) -> Result<String> {
    let resolved = if has_placeholder(endpoint) {
        placeholder()
            .replace_all(endpoint, regex::NoExpand(&urlencoding::encode(input)))
            .into_owned()
    } else {
        endpoint.to_string()
    };

    let mut url = reqwest::Url::parse(&resolved)
        .map_err(|e| GreyflowError::HttpRequest(format!("Invalid URL {}: {}", resolved, e)))?;

    let params: Vec<_> = query.iter().filter(|(_, v)| !v.trim().is_empty()).collect();
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }
    Ok(url.to_string())
}

/// Configured headers, then `Content-Type` for body methods, then auth.
pub fn build_headers(config: &ApiConfig) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = config
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if config.method.has_body() {
        set_header(&mut headers, "Content-Type", "application/json".to_string());
    }

    let value = config.auth_value.as_deref().filter(|v| !v.is_empty());
    match (config.auth_type, value) {
        (AuthType::Bearer, Some(v)) => {
            set_header(&mut headers, "Authorization", format!("Bearer {}", v));
        }
        (AuthType::Apikey, Some(v)) => {
            if let Some(name) = config.auth_header.as_deref().filter(|h| !h.is_empty()) {
                set_header(&mut headers, name, v.to_string());
            }
        }
        (AuthType::Basic, Some(v)) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(v);
            set_header(&mut headers, "Authorization", format!("Basic {}", encoded));
        }
        _ => {}
    }

    headers
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(entry) => entry.1 = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// Body for POST/PUT/PATCH: the substituted template, or the input under
/// the keys common chat-style APIs look for.
pub fn build_body(config: &ApiConfig, input: &str) -> Option<String> {
    if !config.method.has_body() {
        return None;
    }
    match config.body_template.as_deref().filter(|t| !t.is_empty()) {
        Some(template) => Some(substitute(template, input)),
        None => Some(
            serde_json::json!({ "input": input, "query": input, "message": input }).to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_core::types::HttpMethod;

    #[test]
    fn substitutes_both_placeholder_forms() {
        assert_eq!(substitute("a={{input}}&b={input}", "x"), "a=x&b=x");
        assert_eq!(substitute("no placeholder", "x"), "no placeholder");
    }

    #[test]
    fn substitution_does_not_expand_dollar_signs() {
        assert_eq!(substitute("{{input}}", "$1 costs"), "$1 costs");
    }

    #[test]
    fn url_skips_blank_params_and_encodes() {
        let mut query = BTreeMap::new();
        query.insert("q".to_string(), "new york".to_string());
        query.insert("empty".to_string(), "  ".to_string());
        let url = build_url("https://api.example.com/weather", "", &query).unwrap();
        assert_eq!(url, "https://api.example.com/weather?q=new+york");
    }

    #[test]
    fn url_placeholder_is_encoded() {
        let url = build_url(
            "https://restcountries.com/v3.1/name/{{input}}",
            "south africa",
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(url, "https://restcountries.com/v3.1/name/south%20africa");
    }

    #[test]
    fn invalid_url_is_an_error() {
        assert!(build_url("not a url", "", &BTreeMap::new()).is_err());
    }

    #[test]
    fn auth_schemes_render_headers() {
        let mut config = ApiConfig {
            auth_type: AuthType::Bearer,
            auth_value: Some("tok".into()),
            ..Default::default()
        };
        assert!(build_headers(&config).contains(&("Authorization".into(), "Bearer tok".into())));

        config.auth_type = AuthType::Basic;
        config.auth_value = Some("user:pass".into());
        assert!(build_headers(&config)
            .contains(&("Authorization".into(), "Basic dXNlcjpwYXNz".into())));

        config.auth_type = AuthType::Apikey;
        config.auth_value = Some("k".into());
        config.auth_header = Some("X-API-Key".into());
        assert!(build_headers(&config).contains(&("X-API-Key".into(), "k".into())));

        config.auth_header = None;
        assert!(build_headers(&config).is_empty());
    }

    #[test]
    fn content_type_only_for_body_methods() {
        let mut config = ApiConfig::default();
        assert!(build_headers(&config).is_empty());
        config.method = HttpMethod::Post;
        assert_eq!(
            build_headers(&config),
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn default_body_carries_input_three_ways() {
        let config = ApiConfig {
            method: HttpMethod::Post,
            ..Default::default()
        };
        let body: serde_json::Value =
            serde_json::from_str(&build_body(&config, "hi").unwrap()).unwrap();
        assert_eq!(body["input"], "hi");
        assert_eq!(body["query"], "hi");
        assert_eq!(body["message"], "hi");

        let templated = ApiConfig {
            method: HttpMethod::Put,
            body_template: Some(r#"{"text":"{{input}}"}"#.into()),
            ..Default::default()
        };
        assert_eq!(build_body(&templated, "hi").unwrap(), r#"{"text":"hi"}"#);

        assert!(build_body(&ApiConfig::default(), "hi").is_none());
    }
}
