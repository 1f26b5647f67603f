// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! SNS attribute extraction.

use lumigo_trace::constants::{AWS_MESSAGE_ID, AWS_REGION, AWS_RESOURCE_NAME};
use opentelemetry::KeyValue;
use serde_json::Value;

use super::region_from_arn;

/// The topic name is the tail of the topic ARN.
fn topic_name(topic_arn: &str) -> Option<&str> {
    topic_arn.rsplit(':').next().filter(|name| !name.is_empty())
}

pub(crate) fn request_attributes(_operation: &str, body: Option<&Value>) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    let topic_arn = body
        .and_then(|b| b.get("TopicArn").or_else(|| b.get("TargetArn")))
        .and_then(Value::as_str);
    if let Some(arn) = topic_arn {
        if let Some(name) = topic_name(arn) {
            attributes.push(KeyValue::new(AWS_RESOURCE_NAME, name.to_string()));
        }
        if let Some(region) = region_from_arn(arn) {
            attributes.push(KeyValue::new(AWS_REGION, region.to_string()));
        }
    }
    attributes
}

pub(crate) fn response_attributes(operation: &str, body: Option<&Value>) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    if operation == "Publish" {
        if let Some(message_id) = body.and_then(|b| b.get("MessageId")).and_then(Value::as_str) {
            attributes.push(KeyValue::new(AWS_MESSAGE_ID, message_id.to_string()));
        }
    }
    attributes
}
