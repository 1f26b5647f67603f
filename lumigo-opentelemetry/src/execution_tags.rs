// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! User execution tags.
//!
//! Execution tags are user key/values stamped onto every span of the
//! current logical invocation. They live in the ambient propagation
//! context; attach tokens are kept in a thread-local LIFO stack so that
//! detaching cannot leak context across pooled invocations.

use std::cell::RefCell;

use lumigo_trace::constants::EXECUTION_TAG_PREFIX;
use lumigo_trace::{catch_panic, lumigo_error, lumigo_warn};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Array, Context, ContextGuard, KeyValue, Value};

/// The per-invocation tag map, stored in the propagation context.
///
/// Insertion order is preserved; re-adding a key overwrites its value in
/// place.
#[derive(Clone, Debug, Default)]
pub(crate) struct ExecutionTags {
    entries: Vec<(String, Value)>,
}

impl ExecutionTags {
    fn overlay(&self, pairs: Vec<(String, Value)>) -> ExecutionTags {
        let mut merged = self.clone();
        for (key, value) in pairs {
            match merged.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => merged.entries.push((key, value)),
            }
        }
        merged
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

thread_local! {
    static ATTACH_GUARDS: RefCell<Vec<ContextGuard>> = const { RefCell::new(Vec::new()) };
}

fn array_is_empty(array: &Array) -> bool {
    match array {
        Array::Bool(v) => v.is_empty(),
        Array::I64(v) => v.is_empty(),
        Array::F64(v) => v.is_empty(),
        Array::String(v) => v.is_empty(),
        _ => false,
    }
}

fn validate(key: String, value: Value) -> Option<(String, Value)> {
    if key.trim().is_empty() {
        lumigo_error!("Execution tag keys must be non-empty strings; dropping tag");
        return None;
    }
    match &value {
        Value::String(s) if s.as_str().trim().is_empty() => {
            lumigo_error!("Execution tag values must not be empty strings; dropping tag {key:?}");
            None
        }
        Value::Array(array) if array_is_empty(array) => {
            lumigo_error!("Execution tag values must not be empty lists; dropping tag {key:?}");
            None
        }
        _ => Some((key, value)),
    }
}

/// Add execution tags to the current invocation.
///
/// Tags are validated (invalid entries are dropped with a logged error),
/// merged last-writer-wins over any tags already in the ambient context,
/// and attached as a new context whose token is pushed on a LIFO stack.
///
/// With `only_current`, validated tags are instead stamped directly onto
/// the currently recording span, leaving the ambient context untouched;
/// use it when no descendant spans need to inherit the tags.
pub fn add_execution_tags<K, V, I>(pairs: I, only_current: bool)
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    let validated: Vec<(String, Value)> = pairs
        .into_iter()
        .filter_map(|(key, value)| validate(key.into(), value.into()))
        .collect();

    if validated.is_empty() {
        lumigo_warn!("No valid execution tags were provided; nothing to add");
        return;
    }

    if only_current {
        let stamped = Context::map_current(|cx| {
            let span = cx.span();
            if !span.is_recording() {
                return false;
            }
            for (key, value) in &validated {
                span.set_attribute(KeyValue::new(
                    format!("{EXECUTION_TAG_PREFIX}{key}"),
                    value.clone(),
                ));
            }
            true
        });
        if !stamped {
            lumigo_warn!("No recording span is active; execution tags were not stamped");
        }
        return;
    }

    let current = Context::current();
    let merged = current
        .get::<ExecutionTags>()
        .cloned()
        .unwrap_or_default()
        .overlay(validated);
    let guard = current.with_value(merged).attach();
    ATTACH_GUARDS.with(|guards| guards.borrow_mut().push(guard));
}

/// Detach every context attached by [`add_execution_tags`] on this thread,
/// in LIFO order. Individual detach failures are ignored.
pub fn detach_execution_tags() {
    ATTACH_GUARDS.with(|guards| {
        let mut guards = guards.borrow_mut();
        while let Some(guard) = guards.pop() {
            drop(guard);
        }
    });
}

/// Span processor stamping the ambient execution tags onto every span at
/// start time. Failures must never break span creation.
#[derive(Debug, Default)]
pub struct ExecutionTagSpanProcessor;

impl opentelemetry_sdk::trace::SpanProcessor for ExecutionTagSpanProcessor {
    fn on_start(&self, span: &mut opentelemetry_sdk::trace::Span, cx: &Context) {
        use opentelemetry::trace::Span as _;

        catch_panic!({
            if let Some(tags) = cx.get::<ExecutionTags>() {
                if tags.is_empty() {
                    return;
                }
                for (key, value) in tags.iter() {
                    span.set_attribute(KeyValue::new(
                        format!("{EXECUTION_TAG_PREFIX}{key}"),
                        value.clone(),
                    ));
                }
            }
        })
    }

    fn on_end(&self, _span: opentelemetry_sdk::trace::SpanData) {}

    fn force_flush(&self) -> opentelemetry_sdk::error::OTelSdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(
        &self,
        _timeout: std::time::Duration,
    ) -> opentelemetry_sdk::error::OTelSdkResult {
        Ok(())
    }
}
