// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

/// The configuration keys the distribution reads.
///
/// Keeping them in one enum makes the set greppable and lets sources report
/// the key they failed to parse.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedConfigurations {
    LUMIGO_SWITCH_OFF,
    LUMIGO_DEBUG,
    LUMIGO_ENDPOINT,
    LUMIGO_LOGS_ENDPOINT,
    LUMIGO_TRACER_TOKEN,
    LUMIGO_REPORT_DEPENDENCIES,
    LUMIGO_ENABLE_LOGS,
    LUMIGO_DEBUG_SPANDUMP,
    LUMIGO_DEBUG_LOGDUMP,
    LUMIGO_DISABLE_INSTRUMENTATION,
    LUMIGO_SECRET_MASKING_REGEX,
    LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX,
    LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_SERVER,
    LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_CLIENT,
    LUMIGO_AUTO_FILTER_EMPTY_SQS,
    LUMIGO_CONNECTION_TIMEOUT,
    OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT,
    OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT,
    OTEL_SERVICE_NAME,
}

impl SupportedConfigurations {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LUMIGO_SWITCH_OFF => "LUMIGO_SWITCH_OFF",
            Self::LUMIGO_DEBUG => "LUMIGO_DEBUG",
            Self::LUMIGO_ENDPOINT => "LUMIGO_ENDPOINT",
            Self::LUMIGO_LOGS_ENDPOINT => "LUMIGO_LOGS_ENDPOINT",
            Self::LUMIGO_TRACER_TOKEN => "LUMIGO_TRACER_TOKEN",
            Self::LUMIGO_REPORT_DEPENDENCIES => "LUMIGO_REPORT_DEPENDENCIES",
            Self::LUMIGO_ENABLE_LOGS => "LUMIGO_ENABLE_LOGS",
            Self::LUMIGO_DEBUG_SPANDUMP => "LUMIGO_DEBUG_SPANDUMP",
            Self::LUMIGO_DEBUG_LOGDUMP => "LUMIGO_DEBUG_LOGDUMP",
            Self::LUMIGO_DISABLE_INSTRUMENTATION => "LUMIGO_DISABLE_INSTRUMENTATION",
            Self::LUMIGO_SECRET_MASKING_REGEX => "LUMIGO_SECRET_MASKING_REGEX",
            Self::LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX => "LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX",
            Self::LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_SERVER => {
                "LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_SERVER"
            }
            Self::LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_CLIENT => {
                "LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_CLIENT"
            }
            Self::LUMIGO_AUTO_FILTER_EMPTY_SQS => "LUMIGO_AUTO_FILTER_EMPTY_SQS",
            Self::LUMIGO_CONNECTION_TIMEOUT => "LUMIGO_CONNECTION_TIMEOUT",
            Self::OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT => {
                "OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT"
            }
            Self::OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT => "OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT",
            Self::OTEL_SERVICE_NAME => "OTEL_SERVICE_NAME",
        }
    }
}
