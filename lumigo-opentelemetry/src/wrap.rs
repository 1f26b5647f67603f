// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Function wrappers creating one parent span per invocation, with the
//! input and return value captured through the payload serializer.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use opentelemetry::trace::{FutureExt, Span as _, Status, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use serde::Serialize;

use crate::instrumentation::HookRegistry;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

const INPUT_ARGS: &str = "input_args";
const RETURN_VALUE: &str = "return_value";

const TRACER_NAME: &str = "lumigo";

/// Wrap an async handler with a parent span named `name`.
///
/// The serialized input is stamped as `input_args` when the span starts
/// and the serialized result as `return_value` when it completes; an `Err`
/// marks the span status as error instead. All spans the handler creates
/// become children of the wrapping span.
pub fn wrap<F, Fut, I, R, E>(
    name: &'static str,
    handler: F,
) -> impl Fn(I) -> BoxFuture<Result<R, E>>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    I: Serialize + fmt::Debug + Send + 'static,
    R: Serialize + fmt::Debug + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let handler = Arc::new(handler);
    move |input: I| {
        let handler = handler.clone();
        Box::pin(async move {
            let hooks = HookRegistry::global();
            let tracer = global::tracer(TRACER_NAME);
            let mut span = tracer.start(name);
            if let Ok(payload) = hooks.serializer().serialize_data(&input, true) {
                span.set_attribute(KeyValue::new(INPUT_ARGS, payload));
            }

            let cx = Context::current_with_span(span);
            let result = handler(input).with_context(cx.clone()).await;

            match &result {
                Ok(value) => {
                    if let Ok(payload) = hooks.serializer().serialize_data(value, true) {
                        cx.span().set_attribute(KeyValue::new(RETURN_VALUE, payload));
                    }
                }
                Err(e) => cx.span().set_status(Status::error(e.to_string())),
            }
            cx.span().end();
            result
        })
    }
}

/// Synchronous variant of [`wrap`].
pub fn wrap_fn<F, I, R, E>(name: &'static str, handler: F) -> impl Fn(I) -> Result<R, E>
where
    F: Fn(I) -> Result<R, E>,
    I: Serialize + fmt::Debug,
    R: Serialize + fmt::Debug,
    E: fmt::Display,
{
    move |input: I| {
        let hooks = HookRegistry::global();
        let tracer = global::tracer(TRACER_NAME);
        let mut span = tracer.start(name);
        if let Ok(payload) = hooks.serializer().serialize_data(&input, true) {
            span.set_attribute(KeyValue::new(INPUT_ARGS, payload));
        }

        let cx = Context::current_with_span(span);
        let result = {
            let _guard = cx.clone().attach();
            handler(input)
        };

        match &result {
            Ok(value) => {
                if let Ok(payload) = hooks.serializer().serialize_data(value, true) {
                    cx.span().set_attribute(KeyValue::new(RETURN_VALUE, payload));
                }
            }
            Err(e) => cx.span().set_status(Status::error(e.to_string())),
        }
        cx.span().end();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Value;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SimpleSpanProcessor};
    use std::convert::Infallible;

    #[test]
    fn test_wrap_fn_records_input_and_return_value() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(SimpleSpanProcessor::new(exporter.clone()))
            .build();
        global::set_tracer_provider(provider.clone());

        let handler = wrap_fn("handler", |x: u32| Ok::<u32, Infallible>(x + 1));
        assert_eq!(handler(41).unwrap(), 42);

        let spans = exporter.get_finished_spans().unwrap();
        let span = spans.iter().find(|s| s.name == "handler").unwrap();
        let attr = |key: &str| {
            span.attributes
                .iter()
                .find(|kv| kv.key.as_str() == key)
                .map(|kv| kv.value.clone())
        };
        assert_eq!(attr(INPUT_ARGS), Some(Value::from("41".to_string())));
        assert_eq!(attr(RETURN_VALUE), Some(Value::from("42".to_string())));
    }
}
