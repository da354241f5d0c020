//! Output shaping for the CLI: JSON envelopes, field allowlists, text caps.
//!
//! CHANGELOG:
//! - 10/19/2026 - In-place shaping, char-safe truncation, ok/error envelopes
//! - 01/10/2026 - Initial implementation

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Output settings from the global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct OutputControls {
    pub json: bool,
    pub compact: bool,
    /// Comma-separated keys to keep on each object.
    pub fields: Option<String>,
    pub max_text_chars: Option<u32>,
}

impl OutputControls {
    /// Serialize `data`, then apply the field allowlist and text cap.
    pub fn emit<T: Serialize>(&self, data: &T) -> String {
        let mut value = serde_json::to_value(data).unwrap_or(Value::Null);

        if let Some(fields) = self.fields.as_deref() {
            let keep: Vec<&str> = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect();
            retain_fields(&mut value, &keep);
        }
        if let Some(max) = self.max_text_chars {
            cap_strings(&mut value, max as usize);
        }

        let rendered = if self.compact {
            serde_json::to_string(&value)
        } else {
            serde_json::to_string_pretty(&value)
        };
        rendered.unwrap_or_else(|_| "null".to_string())
    }

    pub fn print<T: Serialize>(&self, data: &T) {
        println!("{}", self.emit(data));
    }

    /// Plain text, or `{"ok": true, "<key>": text}` in JSON mode.
    pub fn print_text(&self, key: &str, text: &str) {
        if !self.json {
            println!("{}", text);
            return;
        }
        let mut payload = Map::new();
        payload.insert("ok".to_string(), Value::Bool(true));
        payload.insert(key.to_string(), Value::String(text.to_string()));
        self.print(&Value::Object(payload));
    }

    /// `{"ok": false, ...}` on stdout in JSON mode; the caller reports to stderr.
    pub fn print_error(&self, code: &str, message: &str) {
        if self.json {
            println!("{}", format_error(code, message));
        }
    }
}

/// Keep only `keep` on every object, descending through top-level arrays.
fn retain_fields(value: &mut Value, keep: &[&str]) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(|v| retain_fields(v, keep)),
        Value::Object(map) => map.retain(|k, _| keep.contains(&k.as_str())),
        _ => {}
    }
}

/// Cap every string at `max` chars, marking cut strings with `...`.
fn cap_strings(value: &mut Value, max: usize) {
    match value {
        Value::String(s) => {
            if let Some((cut, _)) = s.char_indices().nth(max) {
                s.truncate(cut);
                s.push_str("...");
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| cap_strings(v, max)),
        Value::Object(map) => map.values_mut().for_each(|v| cap_strings(v, max)),
        _ => {}
    }
}

/// Single-line `{"ok": false, "code": .., "error": ..}`.
pub fn format_error(code: &str, error: &str) -> String {
    json!({ "ok": false, "code": code, "error": error }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_filter_objects_in_arrays() {
        let controls = OutputControls {
            compact: true,
            fields: Some("name, phone".into()),
            ..Default::default()
        };
        let data = json!([{"name": "John", "phone": "555", "score": 0.9}]);
        assert_eq!(controls.emit(&data), r#"[{"name":"John","phone":"555"}]"#);
    }

    #[test]
    fn test_truncation_is_char_safe() {
        let controls = OutputControls {
            compact: true,
            max_text_chars: Some(3),
            ..Default::default()
        };
        let data = json!({"body": "caf\u{e9}s and more"});
        assert_eq!(controls.emit(&data), "{\"body\":\"caf...\"}");
        let data = json!({"body": "\u{e9}\u{e9}\u{e9}\u{e9}"});
        assert_eq!(controls.emit(&data), "{\"body\":\"\u{e9}\u{e9}\u{e9}...\"}");
        let data = json!({"body": "abc"});
        assert_eq!(controls.emit(&data), "{\"body\":\"abc\"}");
    }

    #[test]
    fn test_format_error() {
        let value: Value = serde_json::from_str(&format_error("NOT_FOUND", "nope")).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["code"], json!("NOT_FOUND"));
        assert_eq!(value["error"], json!("nope"));
    }
}
