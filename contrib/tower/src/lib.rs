// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Lumigo HTTP payload capture for tower-based clients and servers.
//!
//! [`LumigoHttpLayer`] records request/response headers and bounded body
//! payloads onto the span that is active around the call. It creates no
//! spans of its own: stack it next to whatever creates the HTTP span
//! (axum/tower server instrumentation, an instrumented client), and it
//! enriches that span.
//!
//! ```rust,ignore
//! let service = tower::ServiceBuilder::new()
//!     .layer(LumigoHttpLayer::new())
//!     .service(app);
//! ```

mod body;

pub use body::CapturedBody;

use std::task::{Context as TaskContext, Poll};

use http::{HeaderMap, Request, Response};
use lumigo_opentelemetry::{HookRegistry, Instrumentor};
use lumigo_trace::constants::{
    HTTP_REQUEST_BODY, HTTP_RESPONSE_BODY, HTTP_RESPONSE_HEADERS, HTTP_STATUS_CODE,
};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};
use pin_project_lite::pin_project;
use serde_json::{json, Map, Value};
use tower_layer::Layer;
use tower_service::Service;

fn headers_to_json(headers: &HeaderMap) -> Value {
    let map: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                json!(String::from_utf8_lossy(value.as_bytes())),
            )
        })
        .collect();
    Value::Object(map)
}

/// Layer applying [`LumigoHttpService`] to the wrapped service.
#[derive(Debug, Clone, Default)]
pub struct LumigoHttpLayer {}

impl LumigoHttpLayer {
    pub fn new() -> Self {
        Self {}
    }
}

impl<S> Layer<S> for LumigoHttpLayer {
    type Service = LumigoHttpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LumigoHttpService { inner }
    }
}

/// Service recording HTTP headers and bounded body payloads onto the
/// currently active span.
#[derive(Debug, Clone)]
pub struct LumigoHttpService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for LumigoHttpService<S>
where
    S: Service<Request<CapturedBody<ReqBody>>, Response = Response<ResBody>>,
    ReqBody: http_body::Body,
    ResBody: http_body::Body,
{
    type Response = Response<CapturedBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let span_cx = Context::current();
        {
            let span = span_cx.span();
            if span.is_recording() {
                HookRegistry::global().record_http_request(
                    &span,
                    Some(&headers_to_json(request.headers())),
                    None,
                );
            }
        }

        let (parts, inner_body) = request.into_parts();
        let request = Request::from_parts(
            parts,
            CapturedBody::new(inner_body, span_cx.clone(), HTTP_REQUEST_BODY),
        );

        ResponseFuture {
            inner: self.inner.call(request),
            span_cx,
        }
    }
}

pin_project! {
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        span_cx: Context,
    }
}

impl<F, ResBody, E> std::future::Future for ResponseFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
    ResBody: http_body::Body,
{
    type Output = Result<Response<CapturedBody<ResBody>>, E>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Self::Output> {
        let this = self.project();
        match this.inner.poll(cx) {
            Poll::Ready(Ok(response)) => {
                let span = this.span_cx.span();
                if span.is_recording() {
                    span.set_attribute(KeyValue::new(
                        HTTP_STATUS_CODE,
                        response.status().as_u16() as i64,
                    ));
                    span.set_attribute(KeyValue::new(
                        HTTP_RESPONSE_HEADERS,
                        HookRegistry::global()
                            .serializer()
                            .serialize(&headers_to_json(response.headers())),
                    ));
                }
                let (parts, inner_body) = response.into_parts();
                let response = Response::from_parts(
                    parts,
                    CapturedBody::new(inner_body, this.span_cx.clone(), HTTP_RESPONSE_BODY),
                );
                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Instrumentor registration for the tower HTTP adapter.
///
/// Tower middleware is applied per service stack, so `install` only claims
/// the ID; the application adds [`LumigoHttpLayer`] where it builds its
/// stacks.
#[derive(Debug, Default)]
pub struct TowerInstrumentation;

impl Instrumentor for TowerInstrumentation {
    fn id(&self) -> &'static str {
        "tower"
    }

    fn framework(&self) -> Option<&'static str> {
        Some("tower")
    }

    fn install(&self, _hooks: &HookRegistry) -> lumigo_trace::Result<()> {
        Ok(())
    }
}
