// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Span processor suppressing spans tagged as non-exportable.

use lumigo_trace::constants::NO_EXPORT_TAG_KEY;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue, Value};
use opentelemetry_sdk::trace::SpanData;

/// Wraps the delivery-side processor (typically the batching processor in
/// front of the OTLP exporter). Spans whose `NO_EXPORT` attribute is `true`
/// are dropped in `on_end` and never reach the wrapped processor; everything
/// else passes through untouched.
#[derive(Debug)]
pub struct NoExportSpanProcessor<P> {
    inner: P,
}

impl<P> NoExportSpanProcessor<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

fn has_no_export(span: &SpanData) -> bool {
    span.attributes.iter().any(|kv| {
        kv.key.as_str() == NO_EXPORT_TAG_KEY && matches!(kv.value, Value::Bool(true))
    })
}

impl<P: opentelemetry_sdk::trace::SpanProcessor> opentelemetry_sdk::trace::SpanProcessor
    for NoExportSpanProcessor<P>
{
    fn on_start(&self, span: &mut opentelemetry_sdk::trace::Span, cx: &Context) {
        self.inner.on_start(span, cx);
    }

    fn on_end(&self, span: SpanData) {
        if has_no_export(&span) {
            return;
        }
        self.inner.on_end(span);
    }

    fn force_flush(&self) -> opentelemetry_sdk::error::OTelSdkResult {
        self.inner.force_flush()
    }

    fn shutdown_with_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> opentelemetry_sdk::error::OTelSdkResult {
        self.inner.shutdown_with_timeout(timeout)
    }

    fn set_resource(&mut self, resource: &opentelemetry_sdk::Resource) {
        self.inner.set_resource(resource);
    }
}

/// Mark a span as non-exportable (or exportable again, before it ends).
pub fn set_no_export<S: opentelemetry::trace::Span>(span: &mut S, value: bool) {
    span.set_attribute(KeyValue::new(NO_EXPORT_TAG_KEY, value));
}

/// Mark the currently active span as non-exportable.
pub fn set_no_export_on_current(value: bool) {
    Context::map_current(|cx| {
        let span = cx.span();
        if span.is_recording() {
            span.set_attribute(KeyValue::new(NO_EXPORT_TAG_KEY, value));
        }
    });
}
