// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! AWS SDK interceptor: payload capture and trace context injection.
//!
//! Hooks the AWS SDK request lifecycle at three points: before
//! serialization (typed input: SQS injection, publish body), before
//! transmit (HTTP request: method, URL, region, headers, body) and around
//! deserialization (HTTP response and typed output). Everything captured
//! lands on the span that is active around the SDK call; capture failures
//! are swallowed and can never fail the AWS call itself.

use std::collections::HashMap;

use aws_sdk_sqs::operation::receive_message::ReceiveMessageOutput;
use aws_sdk_sqs::operation::send_message::{SendMessageInput, SendMessageOutput};
use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::context::{
    AfterDeserializationInterceptorContextRef, BeforeDeserializationInterceptorContextRef,
    BeforeSerializationInterceptorContextMut, BeforeTransmitInterceptorContextRef,
};
use aws_smithy_runtime_api::client::interceptors::Intercept;
use aws_smithy_runtime_api::client::orchestrator::Metadata;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_types::config_bag::ConfigBag;
use lumigo_opentelemetry::{BodyPayload, HookRegistry};
use lumigo_trace::constants::{
    AWS_MESSAGE_ID, AWS_REGION, AWS_SERVICE, HTTP_METHOD, HTTP_URL, MESSAGING_MESSAGE_ID,
    NO_EXPORT_TAG_KEY,
};
use lumigo_trace::{catch_panic, Config};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};
use serde_json::{json, Map, Value};

use crate::services::{region_from_host, AwsService};

/// AWS SDK interceptor wiring Lumigo payload capture and propagation into
/// every operation of the client it is registered on.
///
/// # Example
///
/// ```rust,ignore
/// let sqs_config = aws_sdk_sqs::config::Builder::from(&sdk_config)
///     .interceptor(LumigoInterceptor::new())
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct LumigoInterceptor {
    auto_filter_empty_sqs: bool,
}

impl LumigoInterceptor {
    /// Build from the ambient environment configuration.
    pub fn new() -> Self {
        Self::with_config(&Config::builder().build())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            auto_filter_empty_sqs: config.auto_filter_empty_sqs(),
        }
    }
}

impl Default for LumigoInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

fn current_operation(cfg: &ConfigBag) -> Option<(AwsService, String)> {
    let metadata = cfg.load::<Metadata>()?;
    let service = AwsService::from_service_id(metadata.service())?;
    Some((service, metadata.name().to_string()))
}

struct PropagatorCarrier(HashMap<String, String>);

impl opentelemetry::propagation::Injector for PropagatorCarrier {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

fn extract_propagation_fields() -> HashMap<String, String> {
    let cx = Context::current();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        let mut carrier = PropagatorCarrier(HashMap::new());
        propagator.inject_context(&cx, &mut carrier);
        carrier.0
    })
}

fn host_of(uri: &str) -> Option<&str> {
    let after_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    let authority = after_scheme.split('/').next()?;
    authority.rsplit('@').next()?.split(':').next()
}

fn headers_to_json<'a, I: Iterator<Item = (&'a str, &'a str)>>(headers: I) -> Value {
    let map: Map<String, Value> = headers
        .map(|(key, value)| (key.to_string(), json!(value)))
        .collect();
    Value::Object(map)
}

impl Intercept for LumigoInterceptor {
    fn name(&self) -> &'static str {
        "LumigoInterceptor"
    }

    fn modify_before_serialization(
        &self,
        context: &mut BeforeSerializationInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let Some((service, operation)) = current_operation(cfg) else {
            return Ok(());
        };
        if service != AwsService::Sqs {
            return Ok(());
        }

        let input = context.input_mut();

        catch_panic!({
            if let Some(send_input) = input.downcast_ref::<SendMessageInput>() {
                if let Some(body) = send_input.message_body.as_deref() {
                    let cx = Context::current();
                    let span = cx.span();
                    if span.is_recording() {
                        HookRegistry::global()
                            .record_messaging_publish(&span, BodyPayload::Text(body));
                    }
                }
            }
        });

        let trace_fields = extract_propagation_fields();
        if !trace_fields.is_empty() {
            // Swallow injection errors: propagation must never fail the call.
            let _ = crate::services::sqs::inject(&operation, &trace_fields, input);
        }
        Ok(())
    }

    fn read_before_transmit(
        &self,
        context: &BeforeTransmitInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let Some((service, operation)) = current_operation(cfg) else {
            return Ok(());
        };

        catch_panic!({
            let cx = Context::current();
            let span = cx.span();
            if !span.is_recording() {
                return;
            }
            let hooks = HookRegistry::global();
            let request = context.request();
            let uri = request.uri().to_string();

            span.set_attribute(KeyValue::new(AWS_SERVICE, service.as_str()));
            span.set_attribute(KeyValue::new(HTTP_METHOD, request.method().to_string()));
            span.set_attribute(KeyValue::new(HTTP_URL, uri.clone()));
            if let Some(region) = host_of(&uri).and_then(region_from_host) {
                span.set_attribute(KeyValue::new(AWS_REGION, region.to_string()));
            }

            let body_bytes = request.body().bytes();
            let body_json: Option<Value> =
                body_bytes.and_then(|bytes| serde_json::from_slice(bytes).ok());

            for attribute in service.request_attributes(&operation, body_json.as_ref(), &uri) {
                span.set_attribute(attribute);
            }

            let headers = headers_to_json(request.headers().iter());
            let payload_field = service
                .payload_field()
                .and_then(|field| body_json.as_ref().and_then(|body| body.get(field)));
            match payload_field {
                Some(field_value) => {
                    hooks.record_http_request(
                        &span,
                        Some(&headers),
                        Some(BodyPayload::Json(field_value)),
                    );
                }
                None => {
                    hooks.record_http_request(
                        &span,
                        Some(&headers),
                        body_bytes.map(BodyPayload::Bytes),
                    );
                }
            }
        });
        Ok(())
    }

    fn read_before_deserialization(
        &self,
        context: &BeforeDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let Some((service, operation)) = current_operation(cfg) else {
            return Ok(());
        };

        catch_panic!({
            let cx = Context::current();
            let span = cx.span();
            if !span.is_recording() {
                return;
            }
            let hooks = HookRegistry::global();
            let response = context.response();

            let body_bytes = response.body().bytes();
            let body_json: Option<Value> =
                body_bytes.and_then(|bytes| serde_json::from_slice(bytes).ok());

            let headers = headers_to_json(response.headers().iter());
            hooks.record_http_response(
                &span,
                Some(response.status().as_u16() as i64),
                Some(&headers),
                body_bytes.map(BodyPayload::Bytes),
            );

            for attribute in service.response_attributes(&operation, body_json.as_ref()) {
                span.set_attribute(attribute);
            }
        });
        Ok(())
    }

    fn read_after_deserialization(
        &self,
        context: &AfterDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let Some((service, operation)) = current_operation(cfg) else {
            return Ok(());
        };
        if service != AwsService::Sqs {
            return Ok(());
        }
        let Ok(output) = context.output_or_error() else {
            return Ok(());
        };

        catch_panic!({
            let cx = Context::current();
            let span = cx.span();
            if !span.is_recording() {
                return;
            }

            match operation.as_str() {
                "ReceiveMessage" => {
                    if let Some(received) = output.downcast_ref::<ReceiveMessageOutput>() {
                        let messages = received.messages();
                        if messages.is_empty() {
                            if self.auto_filter_empty_sqs {
                                span.set_attribute(KeyValue::new(NO_EXPORT_TAG_KEY, true));
                            }
                        } else {
                            let first = &messages[0];
                            span.set_attribute(KeyValue::new(
                                MESSAGING_MESSAGE_ID,
                                first.message_id().unwrap_or_default().to_string(),
                            ));
                            if let Some(body) = first.body() {
                                HookRegistry::global()
                                    .record_messaging_consume(&span, BodyPayload::Text(body));
                            }
                        }
                    }
                }
                "SendMessage" => {
                    if let Some(sent) = output.downcast_ref::<SendMessageOutput>() {
                        if let Some(message_id) = sent.message_id() {
                            span.set_attribute(KeyValue::new(
                                AWS_MESSAGE_ID,
                                message_id.to_string(),
                            ));
                        }
                    }
                }
                _ => {}
            }
        });
        Ok(())
    }
}
