// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end consumer-side scenario: empty receives are filtered, spans
//! created while iterating a batch join the receive span's trace, and the
//! restored context is detached once iteration ends.

use aws_sdk_sqs::types::{Message, MessageAttributeValue};
use lumigo_aws_sdk::TracedMessageList;
use lumigo_trace::constants::NO_EXPORT_TAG_KEY;
use opentelemetry::trace::{Span as _, SpanKind, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, Value};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SimpleSpanProcessor, SpanData};

fn find<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|span| span.name == name)
        .unwrap_or_else(|| panic!("span {name:?} not found"))
}

fn attr<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value)
}

fn message(id: &str) -> Message {
    Message::builder().message_id(id).body("payload").build()
}

#[test]
fn consumer_iteration_scenario() {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_span_processor(SimpleSpanProcessor::new(exporter.clone()))
        .build();
    opentelemetry::global::set_tracer_provider(provider.clone());
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    let tracer = provider.tracer("test");

    // Three empty receives: each receive span gets the no-export marker.
    for i in 0..3 {
        let span = tracer
            .span_builder(format!("SQS ReceiveMessage empty {i}"))
            .with_kind(SpanKind::Consumer)
            .start(&tracer);
        let receive_cx = Context::current_with_span(span);
        let _list = lumigo_aws_sdk::testing::process(receive_cx.clone(), Vec::new(), true);
        receive_cx.span().end();
    }

    // A non-empty receive, iterated with nested consumer spans.
    let span = tracer
        .span_builder("SQS ReceiveMessage full")
        .with_kind(SpanKind::Consumer)
        .start(&tracer);
    let receive_cx = Context::current_with_span(span);
    let list = lumigo_aws_sdk::testing::process(receive_cx.clone(), vec![message("m1")], true);
    for _message in &list {
        tracer.in_span("consume1", |_cx| {
            tracer.in_span("consume2", |_cx| {});
        });
    }
    receive_cx.span().end();

    // Another receive whose iteration is broken out of; afterwards the
    // restored context must be gone.
    let remote_trace = "0af7651916cd43dd8448eb211c80319c";
    let carried = Message::builder()
        .message_id("m3")
        .body("payload")
        .message_attributes(
            "traceparent",
            MessageAttributeValue::builder()
                .data_type("String")
                .string_value(format!("00-{remote_trace}-b7ad6b7169203331-01"))
                .build()
                .unwrap(),
        )
        .build();
    let span = tracer
        .span_builder("SQS ReceiveMessage broken")
        .with_kind(SpanKind::Consumer)
        .start(&tracer);
    let receive_cx = Context::current_with_span(span);
    let list: TracedMessageList =
        lumigo_aws_sdk::testing::process(receive_cx.clone(), vec![message("m2"), carried], true);
    for _message in &list {
        break;
    }
    receive_cx.span().end();

    let mut after = tracer.start("after");
    after.end();

    provider.force_flush().unwrap();
    let spans = exporter.get_finished_spans().unwrap();

    // Empty receives carry the terminal no-export marker.
    for i in 0..3 {
        let span = find(&spans, &format!("SQS ReceiveMessage empty {i}"));
        assert_eq!(attr(span, NO_EXPORT_TAG_KEY), Some(&Value::Bool(true)));
    }

    // The consume spans share the receive span's trace, parented
    // receive -> consume1 -> consume2.
    let receive = find(&spans, "SQS ReceiveMessage full");
    let consume1 = find(&spans, "consume1");
    let consume2 = find(&spans, "consume2");
    assert_eq!(
        attr(receive, "messaging.message_id"),
        Some(&Value::from("m1".to_string()))
    );
    assert_eq!(
        consume1.span_context.trace_id(),
        receive.span_context.trace_id()
    );
    assert_eq!(consume1.parent_span_id, receive.span_context.span_id());
    assert_eq!(consume2.parent_span_id, consume1.span_context.span_id());

    // The message beyond the first got a linking child span.
    let broken_receive = find(&spans, "SQS ReceiveMessage broken");
    let message_span = find(&spans, "Message m3");
    assert_eq!(
        message_span.parent_span_id,
        broken_receive.span_context.span_id()
    );
    let links = &message_span.links.links;
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].span_context.trace_id().to_string(),
        remote_trace
    );

    // After `break`, the context is detached: the next top-level span
    // starts its own trace.
    let after = find(&spans, "after");
    assert_ne!(
        after.span_context.trace_id(),
        broken_receive.span_context.trace_id()
    );
    assert_eq!(after.parent_span_id, opentelemetry::trace::SpanId::INVALID);
}

#[test]
fn iteration_restores_receive_context_for_plain_spans() {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_span_processor(SimpleSpanProcessor::new(exporter.clone()))
        .build();
    let tracer = provider.tracer("test");

    let span = tracer
        .span_builder("SQS ReceiveMessage")
        .with_kind(SpanKind::Consumer)
        .start(&tracer);
    let receive_cx = Context::current_with_span(span);
    let list = lumigo_aws_sdk::testing::process(receive_cx.clone(), vec![message("m1")], true);

    for _message in &list {
        // While iterating, the receive span is the active one.
        let current = Context::current();
        assert_eq!(
            current.span().span_context().span_id(),
            receive_cx.span().span_context().span_id()
        );
        let mut child = tracer.start("child");
        child.end();
    }
    // Afterwards the ambient context is clean again.
    assert!(!Context::current().span().span_context().is_valid());
    receive_cx.span().end();

    let spans = exporter.get_finished_spans().unwrap();
    let receive = find(&spans, "SQS ReceiveMessage");
    let child = find(&spans, "child");
    assert_eq!(child.parent_span_id, receive.span_context.span_id());

    // Attribute stamped from the first message.
    assert!(attr(receive, "messaging.message_id").is_some());
}
