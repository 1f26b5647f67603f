// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

/// Boolean span attribute marking a span that must not reach the exporter.
/// Once set to `true` the marker is terminal.
pub const NO_EXPORT_TAG_KEY: &str = "NO_EXPORT";

/// Prefix under which user execution tags are stamped onto spans.
pub const EXECUTION_TAG_PREFIX: &str = "lumigo.execution_tags.";

/// Keys whose subtree is never scrubbed, regardless of the masking regex.
pub const SKIP_SCRUBBING_KEYS: &[&str] = &["lumigo_execution_tags_no_scrub"];

/// Default cap, in bytes, for a single serialized attribute value.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 2048;

/// Suffix appended to payloads cut at the size cap.
pub const TRUNCATION_MARKER: &str = "...[too long]";

/// Replacement emitted for values under a scrubbed key.
pub const SCRUBBED_VALUE: &str = "****";

pub const DEFAULT_SCRUB_PATTERNS: &[&str] = &[
    ".*pass.*",
    ".*key.*",
    ".*secret.*",
    ".*credential.*",
    "SessionToken",
    "x-amz-security-token",
    "Signature",
    "Authorization",
];

// Span attribute families set by the instrumentation adapters.

pub const HTTP_REQUEST_HEADERS: &str = "http.request.headers";
pub const HTTP_REQUEST_BODY: &str = "http.request.body";
pub const HTTP_RESPONSE_HEADERS: &str = "http.response.headers";
pub const HTTP_RESPONSE_BODY: &str = "http.response.body";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";

pub const DB_STATEMENT: &str = "db.statement";
pub const DB_STATEMENT_PARAMETERS: &str = "db.statement.parameters";
pub const DB_REQUEST_BODY: &str = "db.request.body";
pub const DB_RESPONSE_BODY: &str = "db.response.body";

pub const MESSAGING_PUBLISH_BODY: &str = "messaging.publish.body";
pub const MESSAGING_CONSUME_BODY: &str = "messaging.consume.body";
pub const MESSAGING_MESSAGE_ID: &str = "messaging.message_id";

pub const REDIS_REQUEST_ARGS: &str = "redis.request.args";
pub const REDIS_REQUEST_KWARGS: &str = "redis.request.kwargs";
pub const REDIS_RESPONSE_BODY: &str = "redis.response.body";

pub const RPC_PAYLOAD: &str = "rpc.payload";
pub const RPC_REQUEST_PAYLOAD: &str = "rpc.request.payload";

pub const AWS_SERVICE: &str = "aws.service";
pub const AWS_REGION: &str = "aws.region";
pub const AWS_RESOURCE_NAME: &str = "aws.resource.name";
/// Message id echoed by AWS messaging responses.
pub const AWS_MESSAGE_ID: &str = "messageId";

/// Resource attribute naming the first installed web framework.
pub const FRAMEWORK_RESOURCE_KEY: &str = "framework";
pub const UNKNOWN_FRAMEWORK: &str = "Unknown";
