use serde_json::Value;

const MAX_KEYS: usize = 8;
const MAX_CHARS: usize = 200;

/// Fallback explanation built without a model.
///
/// Objects list up to 8 key names; anything else is stringified and cut to
/// 200 characters.
pub fn template_summary(name: &str, result: &Value) -> String {
    match result {
        Value::Object(map) if !map.is_empty() => {
            let keys: Vec<&str> = map.keys().take(MAX_KEYS).map(String::as_str).collect();
            let more = if map.len() > MAX_KEYS {
                format!(" (and {} more)", map.len() - MAX_KEYS)
            } else {
                String::new()
            };
            format!("{} returned an object with keys: {}{}.", name, keys.join(", "), more)
        }
        Value::String(s) => format!("{} returned: {}", name, truncate_chars(s, MAX_CHARS)),
        other => format!("{} returned: {}", name, truncate_chars(&other.to_string(), MAX_CHARS)),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_listed_in_order() {
        let text = template_summary("demo", &json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(text, "demo returned an object with keys: a, b, c.");
    }

    #[test]
    fn test_at_most_eight_keys() {
        let obj: serde_json::Map<String, Value> =
            (0..10).map(|i| (format!("k{:02}", i), json!(i))).collect();
        let text = template_summary("wide", &Value::Object(obj));
        assert!(text.contains("k07"));
        assert!(!text.contains("k08"));
        assert!(text.contains("(and 2 more)"));
    }

    #[test]
    fn test_long_scalar_truncated() {
        let long = "x".repeat(500);
        let text = template_summary("dump", &json!(long));
        assert_eq!(text, format!("dump returned: {}…", "x".repeat(200)));
    }

    #[test]
    fn test_string_is_not_quoted() {
        assert_eq!(template_summary("ping", &json!("pong")), "ping returned: pong");
        assert_eq!(template_summary("n", &json!([1, 2])), "n returned: [1,2]");
    }
}
