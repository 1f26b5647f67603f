// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! DynamoDB attribute extraction.

use lumigo_trace::constants::AWS_RESOURCE_NAME;
use opentelemetry::KeyValue;
use serde_json::Value;

pub(crate) fn request_attributes(_operation: &str, body: Option<&Value>) -> Vec<KeyValue> {
    match body.and_then(|b| b.get("TableName")).and_then(Value::as_str) {
        Some(table) => vec![KeyValue::new(AWS_RESOURCE_NAME, table.to_string())],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_name() {
        let body = json!({"TableName": "orders", "Key": {"id": {"S": "1"}}});
        let attributes = request_attributes("GetItem", Some(&body));
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].value.as_str(), "orders");
    }

    #[test]
    fn test_missing_table_name() {
        assert!(request_attributes("ListTables", Some(&json!({}))).is_empty());
        assert!(request_attributes("ListTables", None).is_empty());
    }
}
