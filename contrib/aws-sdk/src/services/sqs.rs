// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! SQS attribute extraction and trace context injection.

use std::collections::HashMap;

use aws_sdk_sqs::operation::send_message::SendMessageInput;
use aws_sdk_sqs::operation::send_message_batch::SendMessageBatchInput;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::context::Input;
use lumigo_trace::constants::{AWS_MESSAGE_ID, AWS_RESOURCE_NAME};
use opentelemetry::KeyValue;
use serde_json::Value;

const SQS_MAX_ATTRIBUTES: usize = 10;

/// The queue name is the tail of the queue URL
/// (`https://sqs.us-east-1.amazonaws.com/123456789012/my-queue`).
fn queue_name(queue_url: &str) -> Option<&str> {
    queue_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

pub(crate) fn request_attributes(_operation: &str, body: Option<&Value>) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    if let Some(queue_url) = body.and_then(|b| b.get("QueueUrl")).and_then(Value::as_str) {
        if let Some(name) = queue_name(queue_url) {
            attributes.push(KeyValue::new(AWS_RESOURCE_NAME, name.to_string()));
        }
    }
    attributes
}

pub(crate) fn response_attributes(operation: &str, body: Option<&Value>) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    if operation == "SendMessage" {
        if let Some(message_id) = body.and_then(|b| b.get("MessageId")).and_then(Value::as_str) {
            attributes.push(KeyValue::new(AWS_MESSAGE_ID, message_id.to_string()));
        }
    }
    attributes
}

/// Inject the propagator fields as one `String` message attribute per
/// field into SendMessage and SendMessageBatch inputs. Messages already at
/// the attribute limit are left untouched.
pub(crate) fn inject(
    operation: &str,
    trace_fields: &HashMap<String, String>,
    input: &mut Input,
) -> Result<(), BoxError> {
    match operation {
        "SendMessage" => {
            if let Some(send_input) = input.downcast_mut::<SendMessageInput>() {
                inject_into_attributes(
                    send_input.message_attributes.get_or_insert_with(HashMap::new),
                    trace_fields,
                )?;
            }
        }
        "SendMessageBatch" => {
            if let Some(batch_input) = input.downcast_mut::<SendMessageBatchInput>() {
                if let Some(entries) = batch_input.entries.as_mut() {
                    for entry in entries.iter_mut() {
                        inject_into_attributes(
                            entry.message_attributes.get_or_insert_with(HashMap::new),
                            trace_fields,
                        )?;
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn inject_into_attributes(
    attributes: &mut HashMap<String, MessageAttributeValue>,
    trace_fields: &HashMap<String, String>,
) -> Result<(), BoxError> {
    if attributes.len() + trace_fields.len() > SQS_MAX_ATTRIBUTES {
        return Ok(());
    }
    for (key, value) in trace_fields {
        attributes.insert(
            key.clone(),
            MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value.clone())
                .build()?,
        );
    }
    Ok(())
}
