use serde_json::Value;

/// String field of a record, if present and a string.
pub fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|x| x.as_str())
}

/// String field with a fallback for missing or non-string values.
pub fn str_field_or<'a>(v: &'a Value, key: &str, default: &'a str) -> &'a str {
    str_field(v, key).unwrap_or(default)
}

/// Non-negative integer field with a fallback for missing or non-integer values.
pub fn u64_field_or(v: &Value, key: &str, default: u64) -> u64 {
    v.get(key).and_then(|x| x.as_u64()).unwrap_or(default)
}

/// Failure reason of a failed-match record, normalized for tallying:
/// - missing, `null`, `false`, `0`, empty string, empty array or empty object → `"unknown"`
/// - non-string values are rendered as JSON text
/// - longer than `max_chars` characters → cut to `max_chars` plus `"..."`
pub fn error_label(v: &Value, max_chars: usize) -> String {
    let raw = match v.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return "unknown".to_string(),
        Some(Value::String(s)) if s.is_empty() => return "unknown".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => return "unknown".to_string(),
        Some(Value::Array(a)) if a.is_empty() => return "unknown".to_string(),
        Some(Value::Object(o)) if o.is_empty() => return "unknown".to_string(),
        Some(other) => other.to_string(),
    };
    if raw.chars().count() > max_chars {
        let mut cut: String = raw.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    } else {
        raw
    }
}
