// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde_json::Value;

use crate::configuration::Config;
use crate::constants::{
    DEFAULT_MAX_PAYLOAD_SIZE, SCRUBBED_VALUE, SKIP_SCRUBBING_KEYS, TRUNCATION_MARKER,
};
use crate::payload::Scrubber;

/// Error returned when a value cannot be represented as JSON and the caller
/// requested strict mode.
#[derive(Debug)]
pub struct SerializationError {
    message: String,
}

impl SerializationError {
    fn new(e: impl fmt::Display) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payload is not JSON representable: {}", self.message)
    }
}

impl std::error::Error for SerializationError {}

/// Renders payload values to bounded, scrubbed strings.
///
/// The walk keeps a running byte budget instead of post-truncating a fully
/// rendered string, so arbitrarily large inputs cost at most
/// `O(max_size)` output work per entry visited.
pub struct Serializer {
    scrubber: Scrubber,
    max_size: usize,
}

impl Serializer {
    pub fn new(scrubber: Scrubber, max_size: usize) -> Self {
        Self { scrubber, max_size }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Scrubber::from_config(config), config.max_payload_size())
    }

    pub fn with_defaults() -> Self {
        Self::new(Scrubber::with_default_patterns(), DEFAULT_MAX_PAYLOAD_SIZE)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Serialize a JSON value with scrubbing and the size budget applied.
    pub fn serialize(&self, value: &Value) -> String {
        self.serialize_with(value, &[])
    }

    /// Serialize with an exemption list of exact scrub paths.
    ///
    /// A path exempts only the value at that exact position; siblings are
    /// still scrubbed, and so are scrubbable keys nested below the exempted
    /// value.
    pub fn serialize_with(&self, value: &Value, scrub_allow_paths: &[&[&str]]) -> String {
        // Outputs that were already cut by a previous pass are final.
        if let Value::String(s) = value {
            if s.ends_with(TRUNCATION_MARKER) {
                return s.clone();
            }
        }

        let mut walker = Walker {
            out: String::new(),
            remaining: self.max_size as i64,
            truncated: false,
            scrubber: &self.scrubber,
            allow_paths: scrub_allow_paths,
            path: Vec::new(),
        };
        walker.write_value(value, false);
        walker.finish(self.max_size)
    }

    /// Serialize raw bytes: UTF-8 text is treated as a string payload,
    /// anything else falls back to a readable lossy rendering.
    pub fn serialize_bytes(&self, bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(s) => self.serialize(&Value::String(s.to_string())),
            Err(_) => self.serialize(&Value::String(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }

    /// Serialize any serde-serializable value.
    ///
    /// When the value cannot be converted to JSON (non-string map keys,
    /// non-finite floats, serializer errors), strict mode surfaces
    /// [`SerializationError`]; otherwise the `Debug` rendering is emitted,
    /// still subject to the size budget.
    pub fn serialize_data<T: serde::Serialize + fmt::Debug>(
        &self,
        value: &T,
        allow_non_jsonable: bool,
    ) -> Result<String, SerializationError> {
        match serde_json::to_value(value) {
            Ok(v) => Ok(self.serialize(&v)),
            Err(e) => {
                if allow_non_jsonable {
                    Ok(self.clamp(format!("{value:?}")))
                } else {
                    Err(SerializationError::new(e))
                }
            }
        }
    }

    /// Cut an already-rendered string at the size budget.
    pub fn clamp(&self, mut s: String) -> String {
        if s.len() > self.max_size && !s.ends_with(TRUNCATION_MARKER) {
            let mut cut = self.max_size;
            while cut > 0 && !s.is_char_boundary(cut) {
                cut -= 1;
            }
            s.truncate(cut);
            s.push_str(TRUNCATION_MARKER);
        }
        s
    }
}

struct Walker<'a> {
    out: String,
    remaining: i64,
    truncated: bool,
    scrubber: &'a Scrubber,
    allow_paths: &'a [&'a [&'a str]],
    path: Vec<String>,
}

impl Walker<'_> {
    fn emit(&mut self, piece: &str) {
        self.out.push_str(piece);
        self.remaining -= piece.len() as i64;
    }

    fn exhausted(&self) -> bool {
        self.remaining < 0
    }

    fn write_value(&mut self, value: &Value, no_scrub: bool) {
        match value {
            Value::Null => self.emit("null"),
            Value::Bool(b) => self.emit(if *b { "true" } else { "false" }),
            Value::Number(n) => self.emit(&n.to_string()),
            Value::String(s) => self.write_string(s, no_scrub),
            Value::Array(items) => {
                self.emit("[");
                let mut first = true;
                for item in items {
                    if self.exhausted() {
                        self.truncated = true;
                        break;
                    }
                    if !first {
                        self.emit(",");
                    }
                    first = false;
                    // Sequence elements have no key of their own; the
                    // placeholder participates in allow-path matching.
                    self.path.push("null".to_string());
                    self.write_value(item, no_scrub);
                    self.path.pop();
                }
                self.emit("]");
            }
            Value::Object(map) => {
                self.emit("{");
                let mut first = true;
                for (key, val) in map {
                    if self.exhausted() {
                        self.truncated = true;
                        break;
                    }
                    if !first {
                        self.emit(",");
                    }
                    first = false;
                    self.emit(&quote(key));
                    self.emit(":");

                    self.path.push(key.clone());
                    let exempt_subtree = no_scrub || SKIP_SCRUBBING_KEYS.contains(&key.as_str());
                    if !exempt_subtree && self.scrubber.matches(key) && !self.path_allowed() {
                        // Replacement happens before descent: a structure
                        // under a scrubbed key is never traversed.
                        self.emit(&quote(SCRUBBED_VALUE));
                    } else {
                        self.write_value(val, exempt_subtree);
                    }
                    self.path.pop();
                }
                self.emit("}");
            }
        }
    }

    fn write_string(&mut self, s: &str, no_scrub: bool) {
        // Speculatively parse self-describing strings so embedded documents
        // get scrubbed and budgeted like native structures.
        if s.starts_with('{') {
            if let Ok(parsed) = serde_json::from_str::<Value>(s) {
                self.write_value(&parsed, no_scrub);
                return;
            }
        }
        self.emit(&quote(s));
    }

    fn path_allowed(&self) -> bool {
        self.allow_paths.iter().any(|allow| {
            allow.len() == self.path.len()
                && allow.iter().zip(&self.path).all(|(a, b)| b.as_str() == *a)
        })
    }

    fn finish(mut self, max_size: usize) -> String {
        if self.truncated || self.out.len() > max_size {
            let mut cut = max_size.min(self.out.len());
            while cut > 0 && !self.out.is_char_boundary(cut) {
                cut -= 1;
            }
            self.out.truncate(cut);
            self.out.push_str(TRUNCATION_MARKER);
        }
        self.out
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization is infallible")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn serializer() -> Serializer {
        Serializer::with_defaults()
    }

    fn small(max_size: usize) -> Serializer {
        Serializer::new(Scrubber::with_default_patterns(), max_size)
    }

    #[test]
    fn test_scalar_rendering() {
        let s = serializer();
        assert_eq!(s.serialize(&json!(null)), "null");
        assert_eq!(s.serialize(&json!(true)), "true");
        assert_eq!(s.serialize(&json!(42)), "42");
        assert_eq!(s.serialize(&json!(1.5)), "1.5");
        assert_eq!(s.serialize(&json!("hello")), "\"hello\"");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let s = serializer();
        let value = json!({"b": 1, "a": 2, "c": [1, 2, 3]});
        assert_eq!(s.serialize(&value), r#"{"b":1,"a":2,"c":[1,2,3]}"#);
        // Determinism: same input, same output.
        assert_eq!(s.serialize(&value), s.serialize(&value));
    }

    #[test]
    fn test_scrubbing_by_key() {
        let s = serializer();
        let out = s.serialize(&json!({"password": "hunter2", "user": "bob"}));
        assert_eq!(out, r#"{"password":"****","user":"bob"}"#);
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_scrubbed_key_structure_not_traversed() {
        let s = serializer();
        let out = s.serialize(&json!({"credentials": {"user": "bob", "pin": "1234"}}));
        assert_eq!(out, r#"{"credentials":"****"}"#);
    }

    #[test]
    fn test_allow_list_key_bypasses_scrubbing() {
        let s = serializer();
        let out = s.serialize(&json!({"lumigo_execution_tags_no_scrub": {"password": "x"}}));
        assert!(out.contains(r#""password":"x""#), "got {out}");
    }

    #[test]
    fn test_allow_path_is_exact_and_siblings_still_scrubbed() {
        let s = serializer();
        let value = json!({
            "outer": {"Authorization": "keep-me", "password": "scrub-me"}
        });
        let allow: &[&[&str]] = &[&["outer", "Authorization"]];
        let out = s.serialize_with(&value, allow);
        assert!(out.contains(r#""Authorization":"keep-me""#), "got {out}");
        assert!(out.contains(r#""password":"****""#), "got {out}");

        // The same key outside the allowed path is still scrubbed.
        let out = s.serialize_with(&json!({"Authorization": "top"}), allow);
        assert_eq!(out, r#"{"Authorization":"****"}"#);
    }

    #[test]
    fn test_allow_path_with_sequence_placeholder() {
        let s = serializer();
        let value = json!({"records": [{"Signature": "sig"}]});
        let allow: &[&[&str]] = &[&["records", "null", "Signature"]];
        let out = s.serialize_with(&value, allow);
        assert!(out.contains(r#""Signature":"sig""#), "got {out}");
    }

    #[test]
    fn test_self_describing_string_is_parsed() {
        let s = serializer();
        let out = s.serialize(&json!({"body": "{\"password\": \"x\", \"a\": 1}"}));
        assert_eq!(out, r#"{"body":{"password":"****","a":1}}"#);
    }

    #[test]
    fn test_malformed_self_describing_string_falls_back() {
        let s = serializer();
        let out = s.serialize(&json!("{not json"));
        assert_eq!(out, "\"{not json\"");
    }

    #[test]
    fn test_size_budget_invariant() {
        let max_size = 64;
        let s = small(max_size);
        let big: Vec<String> = (0..100).map(|i| format!("value-{i}")).collect();
        let out = s.serialize(&json!({"items": big}));
        assert!(out.len() <= max_size + TRUNCATION_MARKER.len(), "{}", out.len());
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncated_output_is_idempotent() {
        let max_size = 32;
        let s = small(max_size);
        let big: Vec<u32> = (0..100).collect();
        let first = s.serialize(&json!(big));
        assert!(first.ends_with(TRUNCATION_MARKER));
        let second = s.serialize(&Value::String(first.clone()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_untruncated_output_unchanged_by_cap() {
        let s = small(1024);
        let out = s.serialize(&json!({"a": 1}));
        assert_eq!(out, r#"{"a":1}"#);
        assert!(!out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_configured_empty_list_disables_scrubbing() {
        let s = Serializer::new(Scrubber::from_patterns::<&str>(&[]), 2048);
        let out = s.serialize(&json!({"password": "hunter2"}));
        assert_eq!(out, r#"{"password":"hunter2"}"#);
    }

    #[test]
    fn test_serialize_bytes() {
        let s = serializer();
        assert_eq!(s.serialize_bytes(b"plain text"), "\"plain text\"");
        // Invalid UTF-8 falls back to a readable rendering.
        let out = s.serialize_bytes(&[0xff, 0xfe, b'a']);
        assert!(out.contains('a'));
    }

    #[test]
    fn test_serialize_data_strict_mode() {
        let s = serializer();

        #[derive(serde::Serialize, Debug)]
        struct Payload {
            name: &'static str,
        }
        assert_eq!(
            s.serialize_data(&Payload { name: "x" }, false).unwrap(),
            r#"{"name":"x"}"#
        );

        // A map keyed by tuples is not JSON representable.
        let mut map = std::collections::HashMap::new();
        map.insert((1u8, 2u8), "x");
        let strict = s.serialize_data(&map, false);
        assert!(strict.is_err());
        let lax = s.serialize_data(&map, true).unwrap();
        assert!(lax.contains("(1, 2)"), "got {lax}");
    }
}
