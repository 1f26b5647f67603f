// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Context restoration across SQS message iteration.
//!
//! When a consumer iterates a received batch and creates spans per message,
//! those spans must stay children of the `ReceiveMessage` span even though
//! the receive call returned long ago. The wrapper below re-attaches the
//! receive span's context for the duration of each iteration, bounded by a
//! re-entry depth counter so nested loops over the same batch behave.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::OnceLock;

use aws_sdk_sqs::operation::receive_message::ReceiveMessageOutput;
use aws_sdk_sqs::types::{Message, MessageAttributeValue};
use lumigo_trace::constants::{MESSAGING_MESSAGE_ID, NO_EXPORT_TAG_KEY};
use lumigo_trace::{catch_panic, Config};
use opentelemetry::trace::{Link, Span as _, SpanContext, TraceContextExt, Tracer};
use opentelemetry::{global, Context, ContextGuard, KeyValue};

const TRACER_NAME: &str = "lumigo-aws-sdk";

fn auto_filter_empty_receives() -> bool {
    static AUTO_FILTER: OnceLock<bool> = OnceLock::new();
    *AUTO_FILTER.get_or_init(|| Config::builder().build().auto_filter_empty_sqs())
}

/// Per-batch restoration state: the owning receive span's context, the
/// re-entry depth, and the attach token held while the restored context is
/// active.
///
/// Invariants: depth never underflows; a token is held iff depth > 0 and
/// the initial entry actually restored context.
pub struct ScopeContext {
    receive_cx: Context,
    depth: Cell<usize>,
    guard: RefCell<Option<ContextGuard>>,
}

impl ScopeContext {
    fn new(receive_cx: Context) -> Self {
        Self {
            receive_cx,
            depth: Cell::new(0),
            guard: RefCell::new(None),
        }
    }

    /// Enter one iteration. On the first entry, if no span is currently
    /// recording, the receive span's context is attached until the matching
    /// [`exit`](Self::exit).
    pub fn enter(&self) {
        catch_panic!({
            let depth = self.depth.get();
            self.depth.set(depth + 1);
            if depth == 0 {
                let current_is_recording = Context::map_current(|cx| cx.span().is_recording());
                if !current_is_recording {
                    *self.guard.borrow_mut() = Some(self.receive_cx.clone().attach());
                }
            }
        })
    }

    /// Leave one iteration, detaching the restored context when the last
    /// nested iteration ends. Must not raise into the caller's loop on any
    /// exit path.
    pub fn exit(&self) {
        catch_panic!({
            let depth = self.depth.get();
            if depth == 0 {
                return;
            }
            self.depth.set(depth - 1);
            if depth == 1 {
                if let Some(guard) = self.guard.borrow_mut().take() {
                    drop(guard);
                }
            }
        })
    }
}

/// Guard form of the restore/detach pair, for callers that want the scope
/// without iterating.
pub struct ScopeGuard<'a> {
    scope: &'a ScopeContext,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.exit();
    }
}

/// A received message batch that behaves as a normal sequence but restores
/// the receive span's context while it is being iterated.
///
/// Holds thread-affine context state, so the list stays on the consuming
/// thread (as the messages of one receive call do in practice).
pub struct TracedMessageList {
    messages: Vec<Message>,
    scope: ScopeContext,
}

impl TracedMessageList {
    pub fn new(receive_cx: Context, messages: Vec<Message>) -> Self {
        Self {
            messages,
            scope: ScopeContext::new(receive_cx),
        }
    }

    /// Iterate the batch under the restored receive context. Elements are
    /// yielded by index, so `break` works and still detaches.
    pub fn iter(&self) -> TracedIter<'_> {
        self.scope.enter();
        TracedIter {
            list: self,
            index: 0,
        }
    }

    /// Explicitly restore the receive context for the guard's lifetime.
    pub fn attach(&self) -> ScopeGuard<'_> {
        self.scope.enter();
        ScopeGuard { scope: &self.scope }
    }
}

impl Deref for TracedMessageList {
    type Target = [Message];

    fn deref(&self) -> &[Message] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a TracedMessageList {
    type Item = &'a Message;
    type IntoIter = TracedIter<'a>;

    fn into_iter(self) -> TracedIter<'a> {
        self.iter()
    }
}

pub struct TracedIter<'a> {
    list: &'a TracedMessageList,
    index: usize,
}

impl<'a> Iterator for TracedIter<'a> {
    type Item = &'a Message;

    fn next(&mut self) -> Option<&'a Message> {
        let item = self.list.messages.get(self.index);
        self.index += 1;
        item
    }
}

impl Drop for TracedIter<'_> {
    fn drop(&mut self) {
        self.list.scope.exit();
    }
}

struct MessageAttributesExtractor<'a> {
    attributes: &'a HashMap<String, MessageAttributeValue>,
}

impl opentelemetry::propagation::Extractor for MessageAttributesExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
            .and_then(|value| value.string_value())
    }

    fn keys(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }
}

/// Extract the remote span context carried in a message's attributes under
/// the propagator's fields.
fn remote_context_of(message: &Message) -> Option<SpanContext> {
    let attributes = message.message_attributes()?;
    let extractor = MessageAttributesExtractor { attributes };
    let remote_cx =
        global::get_text_map_propagator(|propagator| propagator.extract(&extractor));
    let span_context = remote_cx.span().span_context().clone();
    span_context.is_valid().then_some(span_context)
}

/// Wrap a `ReceiveMessage` result for consumer-side tracing.
///
/// The currently active span is taken to be the receive span. Empty
/// results mark it as non-exportable (unless `LUMIGO_AUTO_FILTER_EMPTY_SQS`
/// is disabled); non-empty results stamp the first message id, and every
/// further message gets a short `Message <id>` child span linking the trace
/// context that travelled inside the message, as a join point for the
/// producer's trace.
pub fn traced_messages(output: &ReceiveMessageOutput) -> TracedMessageList {
    let receive_cx = Context::current();
    process_received_messages(
        receive_cx,
        output.messages().to_vec(),
        auto_filter_empty_receives(),
    )
}

pub(crate) fn process_received_messages(
    receive_cx: Context,
    messages: Vec<Message>,
    auto_filter_empty: bool,
) -> TracedMessageList {
    let receive_span = receive_cx.span();

    let Some(first) = messages.first() else {
        if auto_filter_empty && receive_span.is_recording() {
            receive_span.set_attribute(KeyValue::new(NO_EXPORT_TAG_KEY, true));
        }
        return TracedMessageList::new(receive_cx.clone(), messages);
    };

    if receive_span.is_recording() {
        receive_span.set_attribute(KeyValue::new(
            MESSAGING_MESSAGE_ID,
            first.message_id().unwrap_or_default().to_string(),
        ));
    }

    let tracer = global::tracer(TRACER_NAME);
    for message in messages.iter().skip(1) {
        let mut builder = tracer.span_builder(format!(
            "Message {}",
            message.message_id().unwrap_or_default()
        ));
        if let Some(remote) = remote_context_of(message) {
            builder = builder.with_links(vec![Link::with_context(remote)]);
        }
        let mut span = builder.start_with_context(&tracer, &receive_cx);
        span.end();
    }

    TracedMessageList::new(receive_cx.clone(), messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> Message {
        Message::builder().message_id(id).body("body").build()
    }

    #[test]
    fn test_depth_is_reentrant_and_never_underflows() {
        let scope = ScopeContext::new(Context::new());
        scope.enter();
        scope.enter();
        assert_eq!(scope.depth.get(), 2);
        scope.exit();
        scope.exit();
        scope.exit();
        assert_eq!(scope.depth.get(), 0);
    }

    #[test]
    fn test_list_behaves_as_a_sequence() {
        let list = TracedMessageList::new(
            Context::new(),
            vec![message("a"), message("b"), message("c")],
        );
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].message_id(), Some("b"));

        let ids: Vec<&str> = list.iter().filter_map(|m| m.message_id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_break_still_detaches() {
        let list = TracedMessageList::new(Context::new(), vec![message("a"), message("b")]);
        for m in &list {
            assert_eq!(m.message_id(), Some("a"));
            break;
        }
        assert_eq!(list.scope.depth.get(), 0);
    }

    #[test]
    fn test_nested_iteration_is_supported() {
        let list = TracedMessageList::new(Context::new(), vec![message("a"), message("b")]);
        let mut pairs = Vec::new();
        for outer in &list {
            for inner in &list {
                pairs.push((outer.message_id(), inner.message_id()));
            }
        }
        assert_eq!(pairs.len(), 4);
        assert_eq!(list.scope.depth.get(), 0);
        assert!(list.scope.guard.borrow().is_none());
    }
}
