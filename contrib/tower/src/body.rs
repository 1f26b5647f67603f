// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

use bytes::Buf;
use http_body::{Body, Frame, SizeHint};
use lumigo_opentelemetry::{HookRegistry, StreamingAccumulator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

pin_project! {
    /// Body wrapper accumulating data frames into a span attribute.
    ///
    /// Frames pass through untouched; up to the payload cap their bytes are
    /// copied into an owned accumulator and the running value is stamped on
    /// the captured span. Nothing borrowed from the caller outlives a poll.
    pub struct CapturedBody<B> {
        #[pin]
        inner: B,
        accumulator: StreamingAccumulator,
        span_cx: Context,
        attribute: &'static str,
    }
}

impl<B> CapturedBody<B> {
    pub(crate) fn new(inner: B, span_cx: Context, attribute: &'static str) -> Self {
        Self {
            inner,
            accumulator: StreamingAccumulator::new(HookRegistry::global().max_payload_size()),
            span_cx,
            attribute,
        }
    }
}

impl<B: Body> Body for CapturedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        let result = this.inner.poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &result {
            if let Some(data) = frame.data_ref() {
                if !this.accumulator.is_full() {
                    this.accumulator.push_chunk(data.chunk());
                    let span = this.span_cx.span();
                    if span.is_recording() {
                        span.set_attribute(KeyValue::new(
                            *this.attribute,
                            this.accumulator.value().to_string(),
                        ));
                    }
                }
            }
        }
        result
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
