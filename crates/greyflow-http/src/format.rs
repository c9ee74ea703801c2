use serde_json::{Map, Value};

const MAX_ITEMS: usize = 5;
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Render a response body as text. JSON is summarised; anything else is
/// returned as received.
pub fn render_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => format_response(&json),
        Err(_) => body.to_string(),
    }
}

/// Summarise a JSON value into readable text.
pub fn format_response(data: &Value) -> String {
    match data {
        Value::Array(items) => format_array(items),
        Value::Object(map) => format_object(map),
        other => plain(other),
    }
}

fn format_array(items: &[Value]) -> String {
    if items.is_empty() {
        return "No results found".to_string();
    }
    items
        .iter()
        .take(MAX_ITEMS)
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(obj) => {
                let title = first_truthy(obj, &["title", "name", "summary"])
                    .map(plain)
                    .unwrap_or_else(|| format!("Item {}", index + 1));
                match first_truthy(obj, &["description", "content", "body"]).map(plain) {
                    Some(desc) => format!("{}\n{}", title, truncate(&desc, MAX_DESCRIPTION_CHARS)),
                    None => title,
                }
            }
            other => plain(other),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_object(map: &Map<String, Value>) -> String {
    for wrapper in ["data", "results", "items"] {
        if let Some(inner) = map.get(wrapper).filter(|v| is_truthy(v)) {
            return format_response(inner);
        }
    }

    if let Some(error) = map.get("error").filter(|v| is_truthy(v)) {
        return format!("Error: {}", plain(error));
    }
    if let Some(message) = map.get("message").filter(|v| is_truthy(v)) {
        if map.get("status").and_then(Value::as_str) == Some("error") {
            return format!("Error: {}", plain(message));
        }
    }

    let lines: Vec<String> = map
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::Object(_) | Value::Array(_) => v.to_string(),
                other => plain(other),
            };
            format!("{}: {}", title_case_key(k), value)
        })
        .collect();

    if lines.is_empty() {
        serde_json::to_string_pretty(&Value::Object(map.clone())).unwrap_or_else(|_| "{}".into())
    } else {
        lines.join("\n")
    }
}

/// `firstName` becomes `First Name`.
pub(crate) fn title_case_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else if c.is_ascii_uppercase() {
            out.push(' ');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

fn first_truthy<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| is_truthy(v))
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_array_has_fixed_message() {
        assert_eq!(format_response(&json!([])), "No results found");
    }

    #[test]
    fn arrays_keep_first_five_items() {
        let items: Vec<_> = (1..=8).map(|i| json!({"title": format!("T{}", i)})).collect();
        let out = format_response(&Value::Array(items));
        assert_eq!(out, "T1\n\nT2\n\nT3\n\nT4\n\nT5");
    }

    #[test]
    fn array_items_fall_back_to_numbered_titles() {
        let out = format_response(&json!([{"body": "text"}, {"name": "Named"}, 7]));
        assert_eq!(out, "Item 1\ntext\n\nNamed\n\n7");
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let long = "x".repeat(250);
        let out = format_response(&json!([{"title": "T", "description": long}]));
        assert_eq!(out, format!("T\n{}...", "x".repeat(200)));
    }

    #[test]
    fn wrappers_unwrap_recursively() {
        let out = format_response(&json!({"data": {"results": [{"title": "deep"}]}}));
        assert_eq!(out, "deep");
    }

    #[test]
    fn error_shapes_render_as_errors() {
        assert_eq!(format_response(&json!({"error": "nope"})), "Error: nope");
        assert_eq!(
            format_response(&json!({"status": "error", "message": "bad city"})),
            "Error: bad city"
        );
    }

    #[test]
    fn plain_objects_become_titled_lines() {
        let out = format_response(&json!({
            "cityName": "Paris",
            "temp": 21,
            "wind": {"speed": 3},
            "note": null
        }));
        assert_eq!(out, "City Name: Paris\nTemp: 21\nWind: {\"speed\":3}");
    }

    #[test]
    fn empty_object_renders_as_json() {
        assert_eq!(format_response(&json!({})), "{}");
    }

    #[test]
    fn non_json_body_passes_through() {
        assert_eq!(render_body("<html>hi</html>"), "<html>hi</html>");
        assert_eq!(render_body("42"), "42");
        assert_eq!(render_body("\"quoted\""), "quoted");
    }
}
