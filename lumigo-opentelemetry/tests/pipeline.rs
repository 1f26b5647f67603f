// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end pipeline tests against the in-memory exporter.

use lumigo_opentelemetry::{
    add_execution_tags, detach_execution_tags, set_no_export, ExecutionTagSpanProcessor,
    LumigoSampler, NoExportSpanProcessor,
};
use lumigo_trace::constants::NO_EXPORT_TAG_KEY;
use lumigo_trace::Config;
use opentelemetry::trace::{Span as _, SpanKind, Tracer, TracerProvider as _};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::trace::{
    InMemorySpanExporter, Sampler, SdkTracerProvider, SimpleSpanProcessor, SpanData,
};

fn provider_with(
    exporter: InMemorySpanExporter,
    sampler: Option<Sampler>,
) -> SdkTracerProvider {
    let mut builder = SdkTracerProvider::builder()
        .with_span_processor(ExecutionTagSpanProcessor)
        .with_span_processor(NoExportSpanProcessor::new(SimpleSpanProcessor::new(
            exporter,
        )));
    if let Some(sampler) = sampler {
        builder = builder.with_sampler(sampler);
    }
    builder.build()
}

fn attr<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value)
}

#[test]
fn execution_tags_are_stamped_on_new_spans() {
    let exporter = InMemorySpanExporter::default();
    let provider = provider_with(exporter.clone(), None);
    let tracer = provider.tracer("test");

    add_execution_tags([("env", "prod"), ("user", "bob")], false);
    let mut span = tracer.start("operation");
    span.end();
    detach_execution_tags();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(
        attr(&spans[0], "lumigo.execution_tags.env"),
        Some(&Value::from("prod"))
    );
    assert_eq!(
        attr(&spans[0], "lumigo.execution_tags.user"),
        Some(&Value::from("bob"))
    );
}

#[test]
fn execution_tags_overlay_last_writer_wins() {
    let exporter = InMemorySpanExporter::default();
    let provider = provider_with(exporter.clone(), None);
    let tracer = provider.tracer("test");

    add_execution_tags([("env", "dev")], false);
    add_execution_tags([("env", "prod"), ("region", "us")], false);
    let mut span = tracer.start("operation");
    span.end();
    detach_execution_tags();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(
        attr(&spans[0], "lumigo.execution_tags.env"),
        Some(&Value::from("prod"))
    );
    assert_eq!(
        attr(&spans[0], "lumigo.execution_tags.region"),
        Some(&Value::from("us"))
    );
}

#[test]
fn spans_without_tags_are_untouched() {
    let exporter = InMemorySpanExporter::default();
    let provider = provider_with(exporter.clone(), None);
    let tracer = provider.tracer("test");

    let mut span = tracer.start("operation");
    span.end();

    let spans = exporter.get_finished_spans().unwrap();
    assert!(spans[0]
        .attributes
        .iter()
        .all(|kv| !kv.key.as_str().starts_with("lumigo.execution_tags.")));
}

#[test]
fn no_export_spans_are_suppressed() {
    let exporter = InMemorySpanExporter::default();
    let provider = provider_with(exporter.clone(), None);
    let tracer = provider.tracer("test");

    let mut hidden = tracer.start("hidden");
    set_no_export(&mut hidden, true);
    hidden.end();

    let mut visible = tracer.start("visible");
    visible.end();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "visible");
    assert!(attr(&spans[0], NO_EXPORT_TAG_KEY).is_none());
}

#[test]
fn sampler_drops_matching_server_endpoints() {
    let mut builder = Config::builder();
    builder.set_filter_http_endpoints_regex(vec![".*orders.*".to_string()]);
    let sampler = Sampler::ParentBased(Box::new(LumigoSampler::new(&builder.build())));

    let exporter = InMemorySpanExporter::default();
    let provider = provider_with(exporter.clone(), Some(sampler));
    let tracer = provider.tracer("test");

    let mut dropped = tracer
        .span_builder("GET /orders")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("url.path", "/orders")])
        .start(&tracer);
    dropped.end();

    let mut kept = tracer
        .span_builder("GET /health")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("url.path", "/health")])
        .start(&tracer);
    kept.end();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "GET /health");
}

#[test]
fn client_only_filter_keeps_server_spans() {
    let mut builder = Config::builder();
    builder.set_filter_http_endpoints_regex_client(vec![".*orders.*".to_string()]);
    let sampler = Sampler::ParentBased(Box::new(LumigoSampler::new(&builder.build())));

    let exporter = InMemorySpanExporter::default();
    let provider = provider_with(exporter.clone(), Some(sampler));
    let tracer = provider.tracer("test");

    let mut span = tracer
        .span_builder("GET /orders")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("url.path", "/orders")])
        .start(&tracer);
    span.end();

    assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
}
