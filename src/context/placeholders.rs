// src/context/placeholders.rs

//! `{{dotted.path}}` substitution over JSON-like values.
//!
//! Resolution is best effort: a token whose path cannot be walked (missing
//! key, or a non-map node part way down) is left in place verbatim so that
//! unresolved placeholders stay visible in tool output and logs.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder regex is valid")
});

/// Resolve every placeholder inside `value` against `context`.
///
/// Maps keep their keys, lists keep order and length, and non-string scalars
/// are returned unchanged. The input is never mutated.
pub fn resolve(value: &Value, context: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_str(s, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve placeholders in a single template string.
pub fn resolve_str(template: &str, context: &Map<String, Value>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match lookup(context, &caps[1]) {
            Some(found) => value_to_string(found),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Walk `context` one dotted segment at a time.
///
/// Returns `None` as soon as a segment is missing or the current node is not
/// a map.
pub fn lookup<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').map(str::trim);
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// String form used when a placeholder is substituted.
///
/// `null` becomes the empty string; maps and lists are rendered as compact
/// JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// True if `text` still contains at least one `{{...}}` token.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}
