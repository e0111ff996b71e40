//! Structured payload extraction from raw channel output
//!
//! The automation program prints progress decoration before its answer. The answer is the last
//! line beginning with `{`, usually `{"ok": true, "result": ...}`. Some script results arrive
//! as a JSON document encoded inside a JSON string, sometimes twice.

use serde_json::Value;

/// How many times a string result is decoded as nested JSON
const MAX_NESTED_DECODES: usize = 2;

/// Extracts the structured payload object from raw output
///
/// # Returns
///
/// * `Some(Value)` - The payload document
/// * `None` - No parsable payload line was found
pub fn extract_payload(output: &str) -> Option<Value> {
    let lines: Vec<&str> = output.lines().collect();

    if let Some(start) = lines.iter().rposition(|l| l.trim_start().starts_with('{')) {
        if let Ok(value) = serde_json::from_str::<Value>(lines[start].trim()) {
            return Some(value);
        }

        // Pretty-printed payloads span several lines
        let joined = lines[start..].join("\n");
        if let Ok(value) = serde_json::from_str::<Value>(joined.trim()) {
            return Some(value);
        }

        tracing::debug!("Unparsable payload line: {:.100}", lines[start]);
    }

    // Bare scalar answers, e.g. `true` from a probe script
    let last = lines.iter().rev().map(|l| l.trim()).find(|l| !l.is_empty())?;
    serde_json::from_str::<Value>(last)
        .ok()
        .filter(|v| !v.is_object())
}

/// Extracts the script result from raw output
///
/// Unwraps the `result` field of the payload object and decodes a string result that holds an
/// encoded JSON array, object or string.
pub fn extract_result(output: &str) -> Option<Value> {
    let payload = extract_payload(output)?;

    let mut result = match payload {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    };

    for _ in 0..MAX_NESTED_DECODES {
        let decoded = match &result {
            Value::String(s) if looks_like_json(s) => serde_json::from_str::<Value>(s.trim()).ok(),
            _ => None,
        };

        match decoded {
            Some(value) => result = value,
            None => break,
        }
    }

    Some(result)
}

/// Reads the `targetId` reported by a navigation
pub fn target_id(output: &str) -> Option<String> {
    let payload = extract_payload(output)?;
    payload
        .get("targetId")
        .or_else(|| payload.get("result").and_then(|r| r.get("targetId")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Interprets a script result as a list of strings; non-string items are skipped
pub fn as_string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Interprets a script result as a boolean; anything but `true` is false
pub fn as_flag(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

fn looks_like_json(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with('[') || s.starts_with('{') || s.starts_with('"')
}
