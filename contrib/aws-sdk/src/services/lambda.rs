// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Lambda attribute extraction.

use lumigo_trace::constants::AWS_RESOURCE_NAME;
use opentelemetry::KeyValue;

/// The function name travels in the request path:
/// `/2015-03-31/functions/{name}/invocations`.
fn function_name(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("/functions/")?;
    let name = rest.split('/').next()?;
    (!name.is_empty()).then_some(name)
}

pub(crate) fn request_attributes(_operation: &str, uri: &str) -> Vec<KeyValue> {
    match function_name(uri) {
        Some(name) => vec![KeyValue::new(AWS_RESOURCE_NAME, name.to_string())],
        None => Vec::new(),
    }
}
