//! Human-readable descriptions of controller results.

use serde_json::Value;

const MAX_CHARS: usize = 255;

/// Describe a value for the "controller did not return a response" message.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => format!("a boolean value ({flag})"),
        Value::Number(number) => format!("a number ({number})"),
        Value::String(text) => {
            let ellipsis = if text.chars().count() > MAX_CHARS { "..." } else { "" };
            format!("a string (\"{}{ellipsis}\")", truncate(text))
        }
        Value::Array(items) => {
            let keys: Vec<String> = (0..items.len()).map(|index| format!("{index} => ...")).collect();
            format!("an array ([{}])", truncate(&keys.join(", ")))
        }
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().map(|key| format!("{key} => ...")).collect();
            format!("an object of type map ({{{}}})", truncate(&keys.join(", ")))
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_CHARS).collect()
}
