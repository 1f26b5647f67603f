// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Typed request/response capture callbacks shared by all adapters.
//!
//! Adapters never render payloads themselves: they hand whatever their
//! library gives them (text, bytes, structured values) to the registry,
//! which applies the body-to-attribute rule, scrubbing and the payload cap
//! before anything touches a span.

use std::sync::{Arc, OnceLock};

use lumigo_trace::constants::{
    DB_RESPONSE_BODY, DB_STATEMENT, DB_STATEMENT_PARAMETERS, HTTP_REQUEST_BODY,
    HTTP_REQUEST_HEADERS, HTTP_RESPONSE_BODY, HTTP_RESPONSE_HEADERS, HTTP_STATUS_CODE,
    MESSAGING_CONSUME_BODY, MESSAGING_PUBLISH_BODY, REDIS_REQUEST_ARGS, REDIS_REQUEST_KWARGS,
    REDIS_RESPONSE_BODY, RPC_PAYLOAD, RPC_REQUEST_PAYLOAD,
};
use lumigo_trace::payload::Serializer;
use lumigo_trace::Config;
use opentelemetry::trace::SpanRef;
use opentelemetry::KeyValue;
use serde_json::Value;

/// A payload as an adapter sees it, before rendering.
pub enum BodyPayload<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    Json(&'a Value),
}

/// The capture surface handed to instrumentors at install time and
/// consulted by their hooks at run time.
pub struct HookRegistry {
    serializer: Serializer,
}

static GLOBAL_HOOKS: OnceLock<Arc<HookRegistry>> = OnceLock::new();

impl HookRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            serializer: Serializer::from_config(config),
        }
    }

    pub fn with_defaults() -> Self {
        Self {
            serializer: Serializer::with_defaults(),
        }
    }

    /// Install this registry as the process-wide one. Write-once: later
    /// calls keep the first registry.
    pub fn install_global(registry: Arc<HookRegistry>) {
        let _ = GLOBAL_HOOKS.set(registry);
    }

    /// The process-wide registry, or a default-configured one when
    /// bootstrap has not run.
    pub fn global() -> Arc<HookRegistry> {
        GLOBAL_HOOKS
            .get_or_init(|| Arc::new(HookRegistry::with_defaults()))
            .clone()
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    pub fn max_payload_size(&self) -> usize {
        self.serializer.max_size()
    }

    /// The §body-to-attribute rule: strings are cut at the payload cap,
    /// bytes are decoded as UTF-8 or hex-rendered with an `0x` prefix, and
    /// anything structured goes through the serializer.
    pub fn body_to_attribute(&self, body: BodyPayload<'_>) -> String {
        match body {
            BodyPayload::Text(text) => self.serializer.clamp(text.to_string()),
            BodyPayload::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => self.serializer.clamp(text.to_string()),
                Err(_) => {
                    let take = self.max_payload_size().saturating_sub(2) / 2;
                    let mut out = String::with_capacity(2 + take * 2);
                    out.push_str("0x");
                    for byte in bytes.iter().take(take) {
                        out.push_str(&format!("{byte:02x}"));
                    }
                    self.serializer.clamp(out)
                }
            },
            BodyPayload::Json(value) => self.serializer.serialize(value),
        }
    }

    pub fn record_http_request(
        &self,
        span: &SpanRef<'_>,
        headers: Option<&Value>,
        body: Option<BodyPayload<'_>>,
    ) {
        if let Some(headers) = headers {
            span.set_attribute(KeyValue::new(
                HTTP_REQUEST_HEADERS,
                self.serializer.serialize(headers),
            ));
        }
        if let Some(body) = body {
            span.set_attribute(KeyValue::new(HTTP_REQUEST_BODY, self.body_to_attribute(body)));
        }
    }

    pub fn record_http_response(
        &self,
        span: &SpanRef<'_>,
        status_code: Option<i64>,
        headers: Option<&Value>,
        body: Option<BodyPayload<'_>>,
    ) {
        if let Some(status_code) = status_code {
            span.set_attribute(KeyValue::new(HTTP_STATUS_CODE, status_code));
        }
        if let Some(headers) = headers {
            span.set_attribute(KeyValue::new(
                HTTP_RESPONSE_HEADERS,
                self.serializer.serialize(headers),
            ));
        }
        if let Some(body) = body {
            span.set_attribute(KeyValue::new(
                HTTP_RESPONSE_BODY,
                self.body_to_attribute(body),
            ));
        }
    }

    pub fn record_db_statement(
        &self,
        span: &SpanRef<'_>,
        statement: &str,
        parameters: Option<&Value>,
    ) {
        span.set_attribute(KeyValue::new(
            DB_STATEMENT,
            self.serializer.clamp(statement.to_string()),
        ));
        if let Some(parameters) = parameters {
            span.set_attribute(KeyValue::new(
                DB_STATEMENT_PARAMETERS,
                self.serializer.serialize(parameters),
            ));
        }
    }

    /// Per-fetch database response rows.
    pub fn record_db_response(&self, span: &SpanRef<'_>, body: BodyPayload<'_>) {
        span.set_attribute(KeyValue::new(DB_RESPONSE_BODY, self.body_to_attribute(body)));
    }

    pub fn record_messaging_publish(&self, span: &SpanRef<'_>, body: BodyPayload<'_>) {
        span.set_attribute(KeyValue::new(
            MESSAGING_PUBLISH_BODY,
            self.body_to_attribute(body),
        ));
    }

    pub fn record_messaging_consume(&self, span: &SpanRef<'_>, body: BodyPayload<'_>) {
        span.set_attribute(KeyValue::new(
            MESSAGING_CONSUME_BODY,
            self.body_to_attribute(body),
        ));
    }

    pub fn record_redis_command(
        &self,
        span: &SpanRef<'_>,
        args: Option<&Value>,
        kwargs: Option<&Value>,
    ) {
        if let Some(args) = args {
            span.set_attribute(KeyValue::new(
                REDIS_REQUEST_ARGS,
                self.serializer.serialize(args),
            ));
        }
        if let Some(kwargs) = kwargs {
            span.set_attribute(KeyValue::new(
                REDIS_REQUEST_KWARGS,
                self.serializer.serialize(kwargs),
            ));
        }
    }

    pub fn record_redis_response(&self, span: &SpanRef<'_>, body: BodyPayload<'_>) {
        span.set_attribute(KeyValue::new(
            REDIS_RESPONSE_BODY,
            self.body_to_attribute(body),
        ));
    }

    pub fn record_rpc_request(&self, span: &SpanRef<'_>, payload: BodyPayload<'_>) {
        span.set_attribute(KeyValue::new(
            RPC_REQUEST_PAYLOAD,
            self.body_to_attribute(payload),
        ));
    }

    /// Stamp the running value of a streaming RPC payload. Safe to call on
    /// every chunk: the accumulator is already bounded by the cap.
    pub fn record_rpc_stream(&self, span: &SpanRef<'_>, accumulator: &StreamingAccumulator) {
        span.set_attribute(KeyValue::new(RPC_PAYLOAD, accumulator.value().to_string()));
    }
}

/// Bounded accumulator for payloads that arrive in chunks (streaming
/// bodies, RPC streams).
///
/// Chunks are copied into an owned buffer; no pointer into a caller-owned
/// buffer survives the call. Once the cap is reached the accumulator stops
/// growing.
#[derive(Debug)]
pub struct StreamingAccumulator {
    buffer: String,
    cap: usize,
    full: bool,
}

impl StreamingAccumulator {
    pub fn new(cap: usize) -> Self {
        Self {
            buffer: String::with_capacity(cap.min(4096)),
            cap,
            full: false,
        }
    }

    /// Append a chunk. Returns `false` once the accumulator is full and
    /// further chunks are being discarded.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> bool {
        if self.full {
            return false;
        }
        let budget = self.cap.saturating_sub(self.buffer.len());
        if budget == 0 {
            self.full = true;
            return false;
        }
        let text = String::from_utf8_lossy(chunk);
        let mut take = budget.min(text.len());
        while take > 0 && !text.is_char_boundary(take) {
            take -= 1;
        }
        self.buffer.push_str(&text[..take]);
        if take < text.len() {
            self.full = true;
        }
        !self.full
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn value(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_to_attribute_text_is_capped() {
        let hooks = HookRegistry::with_defaults();
        let long = "x".repeat(5000);
        let out = hooks.body_to_attribute(BodyPayload::Text(&long));
        assert!(out.len() <= hooks.max_payload_size() + "...[too long]".len());
    }

    #[test]
    fn test_body_to_attribute_bytes() {
        let hooks = HookRegistry::with_defaults();
        assert_eq!(hooks.body_to_attribute(BodyPayload::Bytes(b"hello")), "hello");

        let out = hooks.body_to_attribute(BodyPayload::Bytes(&[0xde, 0xad, 0xbe, 0xef, 0xff]));
        assert_eq!(out, "0xdeadbeefff");
    }

    #[test]
    fn test_body_to_attribute_json_is_scrubbed() {
        let hooks = HookRegistry::with_defaults();
        let out = hooks.body_to_attribute(BodyPayload::Json(&json!({"password": "x"})));
        assert_eq!(out, r#"{"password":"****"}"#);
    }

    #[test]
    fn test_streaming_accumulator_caps() {
        let mut acc = StreamingAccumulator::new(10);
        assert!(acc.push_chunk(b"12345"));
        assert!(!acc.push_chunk(b"6789012345"));
        assert!(acc.is_full());
        assert_eq!(acc.value(), "1234567890");
        assert!(!acc.push_chunk(b"more"));
        assert_eq!(acc.value(), "1234567890");
    }

    #[test]
    fn test_streaming_accumulator_respects_char_boundaries() {
        let mut acc = StreamingAccumulator::new(5);
        acc.push_chunk("aééé".as_bytes());
        assert!(acc.value().len() <= 5);
        assert!(acc.value().starts_with('a'));
    }
}
