// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Best-effort dependency report, fired once at startup.
//!
//! The POST runs on its own thread with a bounded timeout; any failure is
//! logged at debug and never surfaces to the application.

use lumigo_trace::{lumigo_debug, Config};
use opentelemetry_sdk::Resource;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Serialize)]
struct Dependency {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct DependencyReport {
    #[serde(rename = "resourceAttributes")]
    resource_attributes: Map<String, Value>,
    dependencies: &'static [Dependency],
}

/// The compiled-in telemetry stack. There is no runtime package registry
/// to enumerate in a Rust process, so the report covers the distribution
/// itself.
const DEPENDENCIES: &[Dependency] = &[
    Dependency {
        name: "lumigo-opentelemetry",
        version: env!("CARGO_PKG_VERSION"),
    },
    Dependency {
        name: "lumigo-trace",
        version: env!("CARGO_PKG_VERSION"),
    },
];

pub(crate) fn report_dependencies(config: &Config, resource: &Resource) {
    if !config.report_dependencies() {
        lumigo_debug!("Dependency reporting is disabled");
        return;
    }
    let Some(token) = config.tracer_token() else {
        // Without a token there is nowhere to report to.
        return;
    };

    let url = format!("{}/v1/dependencies", config.endpoint().trim_end_matches('/'));
    let authorization = format!("LumigoToken {token}");
    let timeout = config.connection_timeout();
    let resource_attributes: Map<String, Value> = resource
        .iter()
        .map(|(key, value)| (key.to_string(), json!(value.to_string())))
        .collect();

    let spawned = std::thread::Builder::new()
        .name("lumigo-dependency-report".to_string())
        .spawn(move || {
            let report = DependencyReport {
                resource_attributes,
                dependencies: DEPENDENCIES,
            };
            let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
                Ok(client) => client,
                Err(e) => {
                    lumigo_debug!("Failed to build dependency report client: {e}");
                    return;
                }
            };
            match client
                .post(&url)
                .header("Authorization", &authorization)
                .json(&report)
                .send()
                .and_then(|response| response.error_for_status())
            {
                Ok(_) => lumigo_debug!("Reported dependencies to {url}"),
                Err(e) => lumigo_debug!("Failed to report dependencies: {e}"),
            }
        });

    if let Err(e) = spawned {
        lumigo_debug!("Failed to spawn dependency report thread: {e}");
    }
}
