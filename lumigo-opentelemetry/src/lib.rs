// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Lumigo OpenTelemetry distribution.
//!
//! [`init`] wires the whole pipeline on process startup: resource
//! attributes, the endpoint-filtering sampler, the execution-tag and
//! no-export span processors, OTLP exporters against the Lumigo edge, the
//! optional span/log dump files, the instrumentation registry, and the
//! one-shot dependency report.
//!
//! # Usage
//! ```no_run
//! let providers = lumigo_opentelemetry::init().expect("lumigo init failed");
//!
//! // ... run the application; use the handles to flush on shutdown.
//! providers.tracer_provider.shutdown().unwrap();
//! ```

pub mod instrumentation;

mod dependency_report;
mod dump;
mod execution_tags;
mod exporters;
mod resource;
mod sampler;
mod span_processor;
mod url_normalizer;
mod wrap;

pub use dump::FileSpanExporter;
pub use execution_tags::{add_execution_tags, detach_execution_tags, ExecutionTagSpanProcessor};
pub use instrumentation::{BodyPayload, HookRegistry, Instrumentor, StreamingAccumulator};
pub use lumigo_trace::Config;
pub use sampler::LumigoSampler;
pub use span_processor::{set_no_export, set_no_export_on_current, NoExportSpanProcessor};
pub use url_normalizer::{normalize_url, server_endpoint};
pub use wrap::{wrap, wrap_fn};

#[cfg(feature = "logs")]
pub use dump::FileLogExporter;

/// Bridge from the `tracing` ecosystem into the log pipeline: add it as a
/// subscriber layer and records flow through the logger provider returned
/// by [`init`].
#[cfg(feature = "logs")]
pub use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;

use std::sync::Arc;

use lumigo_trace::{log, lumigo_error, lumigo_info, lumigo_warn};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracerProvider};

#[cfg(feature = "logs")]
use opentelemetry_sdk::logs::SdkLoggerProvider;

/// Handles to the providers built by [`init`].
pub struct LumigoProviders {
    pub tracer_provider: SdkTracerProvider,
    #[cfg(feature = "logs")]
    pub logger_provider: Option<SdkLoggerProvider>,
    /// IDs of the instrumentations that installed successfully.
    pub installed_instrumentations: Vec<&'static str>,
}

/// Bootstrap the distribution from the environment, with no extra
/// instrumentors beyond what the application wires itself.
pub fn init() -> lumigo_trace::Result<LumigoProviders> {
    init_with_instrumentors(Config::builder().build(), Vec::new())
}

/// Bootstrap the distribution with the given configuration and
/// instrumentors. Instrumentors are installed in the order given; see
/// [`instrumentation::Instrumentor`] for the lifecycle contract.
pub fn init_with_instrumentors(
    config: Config,
    instrumentors: Vec<Box<dyn Instrumentor>>,
) -> lumigo_trace::Result<LumigoProviders> {
    log::set_max_level(config.log_level());

    if config.switched_off() {
        lumigo_info!("Lumigo is switched off, no telemetry will be collected");
        return Ok(LumigoProviders {
            tracer_provider: SdkTracerProvider::builder().build(),
            #[cfg(feature = "logs")]
            logger_provider: None,
            installed_instrumentations: Vec::new(),
        });
    }

    let hooks = Arc::new(HookRegistry::new(&config));
    HookRegistry::install_global(hooks.clone());

    let installed = instrumentation::install_instrumentors(&config, &hooks, &instrumentors);
    let resource = resource::build_resource(&config, installed.framework);

    let mut builder = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_sampler(sampler::parent_based(LumigoSampler::new(&config)))
        .with_span_processor(ExecutionTagSpanProcessor);

    if let Some(path) = config.spandump_file() {
        match FileSpanExporter::create(path) {
            Ok(exporter) => builder = builder.with_simple_exporter(exporter),
            Err(e) => lumigo_error!("Failed to open span dump file {path:?}: {e}"),
        }
    }

    match config.tracer_token() {
        Some(token) => match exporters::build_span_exporter(&config, token) {
            Ok(exporter) => {
                builder = builder.with_span_processor(NoExportSpanProcessor::new(
                    BatchSpanProcessor::builder(exporter).build(),
                ));
            }
            Err(e) => lumigo_error!("Failed to build the span exporter: {e}"),
        },
        None => {
            lumigo_warn!(
                "No LUMIGO_TRACER_TOKEN is set, spans will not be delivered to Lumigo"
            );
        }
    }

    let tracer_provider = builder.build();
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    #[cfg(feature = "logs")]
    let logger_provider = build_logger_provider(&config, &resource);

    dependency_report::report_dependencies(&config, &resource);

    Ok(LumigoProviders {
        tracer_provider,
        #[cfg(feature = "logs")]
        logger_provider,
        installed_instrumentations: installed.ids,
    })
}

#[cfg(feature = "logs")]
fn build_logger_provider(
    config: &Config,
    resource: &opentelemetry_sdk::Resource,
) -> Option<SdkLoggerProvider> {
    use opentelemetry_sdk::logs::BatchLogProcessor;

    if !config.enable_logs() {
        return None;
    }

    let mut builder = SdkLoggerProvider::builder().with_resource(resource.clone());

    if let Some(path) = config.logdump_file() {
        match FileLogExporter::create(path) {
            Ok(exporter) => builder = builder.with_simple_exporter(exporter),
            Err(e) => lumigo_error!("Failed to open log dump file {path:?}: {e}"),
        }
    }

    match config.tracer_token() {
        Some(token) => match exporters::build_log_exporter(config, token) {
            Ok(exporter) => {
                builder =
                    builder.with_log_processor(BatchLogProcessor::builder(exporter).build());
            }
            Err(e) => lumigo_error!("Failed to build the log exporter: {e}"),
        },
        None => {
            lumigo_warn!("No LUMIGO_TRACER_TOKEN is set, logs will not be delivered to Lumigo");
        }
    }

    Some(builder.build())
}
