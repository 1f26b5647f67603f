// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

use lumigo_trace::constants::FRAMEWORK_RESOURCE_KEY;
use lumigo_trace::Config;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;

/// Build the resource shipped with every exported span and log record.
///
/// The SDK's default detectors contribute the service name and telemetry
/// SDK attributes; on top of those we stamp the distro version and the
/// detected web framework.
pub(crate) fn build_resource(config: &Config, framework: &str) -> Resource {
    let mut attributes = vec![
        KeyValue::new("lumigo.distro.version", config.tracer_version().to_string()),
        KeyValue::new(FRAMEWORK_RESOURCE_KEY, framework.to_string()),
    ];
    if let Some(service) = config.service_name() {
        attributes.push(KeyValue::new(SERVICE_NAME, service.to_string()));
    }
    Resource::builder().with_attributes(attributes).build()
}
