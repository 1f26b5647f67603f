// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Per-service attribute extraction.
//!
//! Operations on the supported AWS services carry their resource identity
//! in service-specific places (queue URL, topic ARN, table name, function
//! path); these modules pull out the region, the resource name and the
//! service-specific payload field.

pub(crate) mod dynamodb;
pub(crate) mod lambda;
pub(crate) mod sns;
pub(crate) mod sqs;

use opentelemetry::KeyValue;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AwsService {
    Sqs,
    Sns,
    Lambda,
    DynamoDb,
}

impl AwsService {
    pub(crate) fn from_service_id(service_id: &str) -> Option<Self> {
        match service_id {
            "SQS" => Some(Self::Sqs),
            "SNS" => Some(Self::Sns),
            "Lambda" => Some(Self::Lambda),
            "DynamoDB" => Some(Self::DynamoDb),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Sqs => "sqs",
            Self::Sns => "sns",
            Self::Lambda => "lambda",
            Self::DynamoDb => "dynamodb",
        }
    }

    /// Attributes derived from the serialized request payload and URI.
    pub(crate) fn request_attributes(
        &self,
        operation: &str,
        body: Option<&Value>,
        uri: &str,
    ) -> Vec<KeyValue> {
        match self {
            Self::Sqs => sqs::request_attributes(operation, body),
            Self::Sns => sns::request_attributes(operation, body),
            Self::Lambda => lambda::request_attributes(operation, uri),
            Self::DynamoDb => dynamodb::request_attributes(operation, body),
        }
    }

    /// Attributes derived from the deserialized response payload.
    pub(crate) fn response_attributes(
        &self,
        operation: &str,
        body: Option<&Value>,
    ) -> Vec<KeyValue> {
        match self {
            Self::Sqs => sqs::response_attributes(operation, body),
            Self::Sns => sns::response_attributes(operation, body),
            Self::Lambda | Self::DynamoDb => Vec::new(),
        }
    }

    /// The request field carrying the message payload, when the service
    /// has one distinct from the whole API parameter set.
    pub(crate) fn payload_field(&self) -> Option<&'static str> {
        match self {
            Self::Sqs => Some("MessageBody"),
            Self::Sns => Some("Message"),
            Self::Lambda | Self::DynamoDb => None,
        }
    }
}

/// Region from an ARN (`arn:aws:sns:us-east-1:123:topic`).
pub(crate) fn region_from_arn(arn: &str) -> Option<&str> {
    let region = arn.split(':').nth(3)?;
    (!region.is_empty()).then_some(region)
}

/// Region from a service endpoint host such as
/// `sqs.us-east-1.amazonaws.com`.
pub(crate) fn region_from_host(host: &str) -> Option<&str> {
    let labels: Vec<&str> = host.split('.').collect();
    let amazonaws = labels.iter().position(|label| *label == "amazonaws")?;
    let region = *labels.get(amazonaws.checked_sub(1)?)?;
    region.contains('-').then_some(region)
}
