//! Small helpers shared by the merge engine and the flat-key codecs.

use serde_yaml::Value;

/// Render a mapping key for dotted paths and error messages.
pub(crate) fn key_display(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| "?".to_string()),
    }
}

/// Append a key to a dotted path, treating the empty path as the root.
pub(crate) fn path_push(path: &str, key: &Value) -> String {
    let key = key_display(key);
    if path.is_empty() {
        key
    } else {
        format!("{path}.{key}")
    }
}

/// Parse a raw string as a YAML literal, falling back to a plain string.
///
/// This is how CLI-style values acquire types: `"1"` becomes a number,
/// `"[1, 2]"` a sequence, `"true"` a boolean, and anything that does not
/// parse stays a string.
pub fn parse_yaml_literal(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_renders_scalars() {
        assert_eq!(key_display(&Value::from("name")), "name");
        assert_eq!(key_display(&Value::from(3)), "3");
        assert_eq!(key_display(&Value::Bool(true)), "true");
        assert_eq!(key_display(&Value::Null), "null");
    }

    #[test]
    fn path_push_joins_with_dots() {
        assert_eq!(path_push("", &Value::from("a")), "a");
        assert_eq!(path_push("a.b", &Value::from(0)), "a.b.0");
    }

    #[test]
    fn yaml_literals_acquire_types() {
        assert_eq!(parse_yaml_literal("1"), Value::from(1));
        assert_eq!(parse_yaml_literal("true"), Value::Bool(true));
        assert_eq!(
            parse_yaml_literal("[1, 2]"),
            Value::Sequence(vec![Value::from(1), Value::from(2)])
        );
        assert_eq!(parse_yaml_literal("plain text"), Value::from("plain text"));
    }

    #[test]
    fn unparseable_literals_stay_strings() {
        assert_eq!(parse_yaml_literal("{unclosed"), Value::from("{unclosed"));
    }
}
