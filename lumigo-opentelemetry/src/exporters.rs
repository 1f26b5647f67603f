// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! OTLP exporter construction against the Lumigo ingest edge.
//!
//! The wire protocol itself is the exporter collaborator's concern; this
//! module only points it at the right endpoint and attaches the
//! authentication header.

use std::collections::HashMap;

use lumigo_trace::Config;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};

fn auth_headers(token: &str) -> HashMap<String, String> {
    HashMap::from([("Authorization".to_string(), format!("LumigoToken {token}"))])
}

fn signal_endpoint(base: &str, path: &str) -> String {
    format!("{}/{path}", base.trim_end_matches('/'))
}

pub(crate) fn build_span_exporter(
    config: &Config,
    token: &str,
) -> lumigo_trace::Result<opentelemetry_otlp::SpanExporter> {
    Ok(opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(signal_endpoint(config.endpoint(), "v1/traces"))
        .with_headers(auth_headers(token))
        .build()?)
}

#[cfg(feature = "logs")]
pub(crate) fn build_log_exporter(
    config: &Config,
    token: &str,
) -> lumigo_trace::Result<opentelemetry_otlp::LogExporter> {
    Ok(opentelemetry_otlp::LogExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(signal_endpoint(config.logs_endpoint(), "v1/logs"))
        .with_headers(auth_headers(token))
        .build()?)
}
