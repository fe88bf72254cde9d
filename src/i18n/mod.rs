//! User-facing texts.
//!
//! Strings are embedded at compile time and looked up by dotted key,
//! e.g. `get_text("review.card")`. Placeholders look like `{name}`.

use std::sync::LazyLock;

use serde_json::Value;

static TEXTS: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(include_str!("en.json")).unwrap_or(Value::Null)
});

/// Get text for a dotted key. Unknown keys come back unchanged.
pub fn get_text(key: &str) -> String {
    resolve_key(&TEXTS, key).unwrap_or_else(|| key.to_string())
}

/// Get text for a key and substitute `{placeholder}` values.
pub fn format_text(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(get_text(key), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    let mut current = val;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_lookup() {
        assert!(get_text("review.finished").contains("Queue is empty"));
        assert_eq!(get_text("review.missing_key"), "review.missing_key");
    }

    #[test]
    fn test_format_text() {
        let text = format_text("post.published", &[("count", "3")]);
        assert!(text.contains("(3 item(s))"));
    }
}
