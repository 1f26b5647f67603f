// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, str::FromStr, time::Duration};

use crate::configuration::sources::{CompositeConfigSourceResult, CompositeSource};
use crate::configuration::supported_configurations::SupportedConfigurations;
use crate::constants::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::lumigo_warn;

pub const TRACER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default ingest edge for both spans and logs.
pub const DEFAULT_ENDPOINT: &str = "https://ga-otlp.lumigo-tracer-edge.golumigo.com";

const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Finalized configuration for the distribution.
///
/// Values are pulled from the environment (and other sources, in order of
/// precedence) once, at build time; the rest of the crate only ever reads
/// the finalized struct.
///
/// # Usage
/// ```
/// use lumigo_trace::Config;
///
/// // This pulls configuration from the environment and other sources
/// let mut builder = Config::builder();
///
/// // Manual overrides
/// builder.set_tracer_token(Some("t_0123456789abcdef01234".to_string()));
///
/// let config = builder.build();
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    tracer_version: &'static str,

    switched_off: bool,
    debug: bool,

    endpoint: Cow<'static, str>,
    logs_endpoint: Cow<'static, str>,
    tracer_token: Option<String>,

    report_dependencies: bool,
    enable_logs: bool,

    spandump_file: Option<String>,
    logdump_file: Option<String>,

    /// Comma separated, case-sensitive instrumentation IDs to skip.
    disabled_instrumentations: Vec<String>,
    /// When set, replaces the default secret masking patterns wholesale.
    /// An empty list disables scrubbing.
    secret_masking_regex: Option<Vec<String>>,

    filter_http_endpoints_regex: Vec<String>,
    filter_http_endpoints_regex_server: Vec<String>,
    filter_http_endpoints_regex_client: Vec<String>,

    auto_filter_empty_sqs: bool,
    connection_timeout: Duration,
    max_payload_size: usize,

    service_name: Option<String>,
}

/// Wrapper to parse booleans the way the env conventions allow them to be
/// spelled ("true"/"True"/"TRUE"/"1", same for false).
struct EnvBool(bool);

impl FromStr for EnvBool {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("true") || s == "1" {
            Ok(EnvBool(true))
        } else if s.eq_ignore_ascii_case("false") || s == "0" {
            Ok(EnvBool(false))
        } else {
            Err("expected true or false")
        }
    }
}

/// Wrapper to parse a JSON array of strings.
struct JsonStringList(Vec<String>);

impl FromStr for JsonStringList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
            .map(JsonStringList)
            .map_err(|e| e.to_string())
    }
}

/// Wrapper to parse a "," separated string to a vector of trimmed items.
struct CommaList(Vec<String>);

impl FromStr for CommaList {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CommaList(
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        ))
    }
}

impl Config {
    fn from_sources(sources: &CompositeSource) -> Self {
        let default = Config::default();

        /// Convert a CompositeConfigSourceResult<T> into an Option<T>,
        /// logging parse errors once. A value that fails to parse is
        /// treated as absent.
        fn to_val<T>(res: CompositeConfigSourceResult<T>) -> Option<T> {
            for error in &res.errors {
                lumigo_warn!(
                    "Ignoring invalid value for {}: {:?}",
                    res.name.as_str(),
                    error
                );
            }
            res.value.map(|c| c.value)
        }

        let max_payload_size = to_val(
            sources.get_parse::<usize>(SupportedConfigurations::OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT),
        )
        .or_else(|| {
            to_val(
                sources.get_parse::<usize>(SupportedConfigurations::OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT),
            )
        })
        .unwrap_or(default.max_payload_size);

        Self {
            tracer_version: default.tracer_version,
            switched_off: to_val(
                sources.get_parse::<EnvBool>(SupportedConfigurations::LUMIGO_SWITCH_OFF),
            )
            .map(|EnvBool(b)| b)
            .unwrap_or(default.switched_off),
            debug: to_val(sources.get_parse::<EnvBool>(SupportedConfigurations::LUMIGO_DEBUG))
                .map(|EnvBool(b)| b)
                .unwrap_or(default.debug),
            endpoint: to_val(sources.get(SupportedConfigurations::LUMIGO_ENDPOINT))
                .map(Cow::Owned)
                .unwrap_or(default.endpoint),
            logs_endpoint: to_val(sources.get(SupportedConfigurations::LUMIGO_LOGS_ENDPOINT))
                .map(Cow::Owned)
                .unwrap_or(default.logs_endpoint),
            tracer_token: to_val(sources.get(SupportedConfigurations::LUMIGO_TRACER_TOKEN))
                .or(default.tracer_token),
            report_dependencies: to_val(
                sources.get_parse::<EnvBool>(SupportedConfigurations::LUMIGO_REPORT_DEPENDENCIES),
            )
            .map(|EnvBool(b)| b)
            .unwrap_or(default.report_dependencies),
            enable_logs: to_val(
                sources.get_parse::<EnvBool>(SupportedConfigurations::LUMIGO_ENABLE_LOGS),
            )
            .map(|EnvBool(b)| b)
            .unwrap_or(default.enable_logs),
            spandump_file: to_val(sources.get(SupportedConfigurations::LUMIGO_DEBUG_SPANDUMP))
                .or(default.spandump_file),
            logdump_file: to_val(sources.get(SupportedConfigurations::LUMIGO_DEBUG_LOGDUMP))
                .or(default.logdump_file),
            disabled_instrumentations: to_val(
                sources
                    .get_parse::<CommaList>(SupportedConfigurations::LUMIGO_DISABLE_INSTRUMENTATION),
            )
            .map(|CommaList(ids)| ids)
            .unwrap_or(default.disabled_instrumentations),
            secret_masking_regex: to_val(
                sources
                    .get_parse::<JsonStringList>(SupportedConfigurations::LUMIGO_SECRET_MASKING_REGEX),
            )
            .map(|JsonStringList(patterns)| patterns)
            .map(Some)
            .unwrap_or(default.secret_masking_regex),
            filter_http_endpoints_regex: to_val(sources.get_parse::<JsonStringList>(
                SupportedConfigurations::LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX,
            ))
            .map(|JsonStringList(patterns)| patterns)
            .unwrap_or(default.filter_http_endpoints_regex),
            filter_http_endpoints_regex_server: to_val(sources.get_parse::<JsonStringList>(
                SupportedConfigurations::LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_SERVER,
            ))
            .map(|JsonStringList(patterns)| patterns)
            .unwrap_or(default.filter_http_endpoints_regex_server),
            filter_http_endpoints_regex_client: to_val(sources.get_parse::<JsonStringList>(
                SupportedConfigurations::LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_CLIENT,
            ))
            .map(|JsonStringList(patterns)| patterns)
            .unwrap_or(default.filter_http_endpoints_regex_client),
            auto_filter_empty_sqs: to_val(
                sources.get_parse::<EnvBool>(SupportedConfigurations::LUMIGO_AUTO_FILTER_EMPTY_SQS),
            )
            .map(|EnvBool(b)| b)
            .unwrap_or(default.auto_filter_empty_sqs),
            connection_timeout: to_val(
                sources.get_parse::<f64>(SupportedConfigurations::LUMIGO_CONNECTION_TIMEOUT),
            )
            .map(Duration::from_secs_f64)
            .unwrap_or(default.connection_timeout),
            max_payload_size,
            service_name: to_val(sources.get(SupportedConfigurations::OTEL_SERVICE_NAME))
                .or(default.service_name),
        }
    }

    fn builder_with_sources(sources: &CompositeSource) -> ConfigBuilder {
        ConfigBuilder {
            config: Config::from_sources(sources),
        }
    }

    /// Creates a new builder over the detected configuration.
    pub fn builder() -> ConfigBuilder {
        Self::builder_with_sources(&CompositeSource::default_sources())
    }

    pub fn tracer_version(&self) -> &str {
        self.tracer_version
    }

    pub fn switched_off(&self) -> bool {
        self.switched_off
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn log_level(&self) -> crate::log::LevelFilter {
        if self.debug {
            crate::log::LevelFilter::Debug
        } else {
            crate::log::LevelFilter::Error
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn logs_endpoint(&self) -> &str {
        &self.logs_endpoint
    }

    pub fn tracer_token(&self) -> Option<&str> {
        self.tracer_token.as_deref()
    }

    pub fn report_dependencies(&self) -> bool {
        self.report_dependencies
    }

    pub fn enable_logs(&self) -> bool {
        self.enable_logs
    }

    pub fn spandump_file(&self) -> Option<&str> {
        self.spandump_file.as_deref()
    }

    pub fn logdump_file(&self) -> Option<&str> {
        self.logdump_file.as_deref()
    }

    pub fn disabled_instrumentations(&self) -> impl Iterator<Item = &str> {
        self.disabled_instrumentations.iter().map(String::as_str)
    }

    pub fn secret_masking_regex(&self) -> Option<&[String]> {
        self.secret_masking_regex.as_deref()
    }

    pub fn filter_http_endpoints_regex(&self) -> &[String] {
        &self.filter_http_endpoints_regex
    }

    pub fn filter_http_endpoints_regex_server(&self) -> &[String] {
        &self.filter_http_endpoints_regex_server
    }

    pub fn filter_http_endpoints_regex_client(&self) -> &[String] {
        &self.filter_http_endpoints_regex_client
    }

    pub fn auto_filter_empty_sqs(&self) -> bool {
        self.auto_filter_empty_sqs
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tracer_version: TRACER_VERSION,
            switched_off: false,
            debug: false,
            endpoint: Cow::Borrowed(DEFAULT_ENDPOINT),
            logs_endpoint: Cow::Borrowed(DEFAULT_ENDPOINT),
            tracer_token: None,
            report_dependencies: true,
            enable_logs: false,
            spandump_file: None,
            logdump_file: None,
            disabled_instrumentations: Vec::new(),
            secret_masking_regex: None,
            filter_http_endpoints_regex: Vec::new(),
            filter_http_endpoints_regex_server: Vec::new(),
            filter_http_endpoints_regex_client: Vec::new(),
            auto_filter_empty_sqs: true,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            service_name: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("switched_off", &self.switched_off)
            .field("debug", &self.debug)
            .field("endpoint", &self.endpoint)
            .field("logs_endpoint", &self.logs_endpoint)
            .field("tracer_token", &self.tracer_token.as_ref().map(|_| "****"))
            .field("report_dependencies", &self.report_dependencies)
            .field("enable_logs", &self.enable_logs)
            .field("spandump_file", &self.spandump_file)
            .field("logdump_file", &self.logdump_file)
            .field(
                "disabled_instrumentations",
                &self.disabled_instrumentations,
            )
            .field("auto_filter_empty_sqs", &self.auto_filter_empty_sqs)
            .field("connection_timeout", &self.connection_timeout)
            .field("max_payload_size", &self.max_payload_size)
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn set_switched_off(&mut self, switched_off: bool) -> &mut Self {
        self.config.switched_off = switched_off;
        self
    }

    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.config.debug = debug;
        self
    }

    pub fn set_endpoint(&mut self, endpoint: String) -> &mut Self {
        self.config.endpoint = Cow::Owned(endpoint);
        self
    }

    pub fn set_logs_endpoint(&mut self, endpoint: String) -> &mut Self {
        self.config.logs_endpoint = Cow::Owned(endpoint);
        self
    }

    pub fn set_tracer_token(&mut self, token: Option<String>) -> &mut Self {
        self.config.tracer_token = token;
        self
    }

    pub fn set_report_dependencies(&mut self, report: bool) -> &mut Self {
        self.config.report_dependencies = report;
        self
    }

    pub fn set_enable_logs(&mut self, enable: bool) -> &mut Self {
        self.config.enable_logs = enable;
        self
    }

    pub fn set_spandump_file(&mut self, path: Option<String>) -> &mut Self {
        self.config.spandump_file = path;
        self
    }

    pub fn set_logdump_file(&mut self, path: Option<String>) -> &mut Self {
        self.config.logdump_file = path;
        self
    }

    pub fn set_disabled_instrumentations(&mut self, ids: Vec<String>) -> &mut Self {
        self.config.disabled_instrumentations = ids;
        self
    }

    pub fn set_secret_masking_regex(&mut self, patterns: Option<Vec<String>>) -> &mut Self {
        self.config.secret_masking_regex = patterns;
        self
    }

    pub fn set_filter_http_endpoints_regex(&mut self, patterns: Vec<String>) -> &mut Self {
        self.config.filter_http_endpoints_regex = patterns;
        self
    }

    pub fn set_filter_http_endpoints_regex_server(&mut self, patterns: Vec<String>) -> &mut Self {
        self.config.filter_http_endpoints_regex_server = patterns;
        self
    }

    pub fn set_filter_http_endpoints_regex_client(&mut self, patterns: Vec<String>) -> &mut Self {
        self.config.filter_http_endpoints_regex_client = patterns;
        self
    }

    pub fn set_auto_filter_empty_sqs(&mut self, enabled: bool) -> &mut Self {
        self.config.auto_filter_empty_sqs = enabled;
        self
    }

    pub fn set_connection_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.connection_timeout = timeout;
        self
    }

    pub fn set_max_payload_size(&mut self, size: usize) -> &mut Self {
        self.config.max_payload_size = size;
        self
    }

    pub fn set_service_name(&mut self, name: Option<String>) -> &mut Self {
        self.config.service_name = name;
        self
    }

    pub fn build(&mut self) -> Config {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::sources::{ConfigSourceOrigin, HashMapSource};

    fn config_from(entries: &[(&str, &str)]) -> Config {
        let mut sources = CompositeSource::new();
        sources.add_source(HashMapSource::from_iter(
            entries.iter().copied(),
            ConfigSourceOrigin::EnvVar,
        ));
        Config::builder_with_sources(&sources).build()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert!(!config.switched_off());
        assert!(!config.debug());
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.tracer_token(), None);
        assert!(config.report_dependencies());
        assert!(!config.enable_logs());
        assert!(config.auto_filter_empty_sqs());
        assert_eq!(config.max_payload_size(), DEFAULT_MAX_PAYLOAD_SIZE);
        assert_eq!(config.connection_timeout(), DEFAULT_CONNECTION_TIMEOUT);
    }

    #[test]
    fn test_boolean_spellings() {
        for spelling in ["true", "True", "TRUE", "1"] {
            let config = config_from(&[("LUMIGO_SWITCH_OFF", spelling)]);
            assert!(config.switched_off(), "spelling {spelling:?}");
        }
        let config = config_from(&[("LUMIGO_SWITCH_OFF", "maybe")]);
        assert!(!config.switched_off(), "invalid value treated as absent");
    }

    #[test]
    fn test_disable_list_is_trimmed_but_case_preserved() {
        let config = config_from(&[("LUMIGO_DISABLE_INSTRUMENTATION", " boto , Tower,")]);
        let ids: Vec<&str> = config.disabled_instrumentations().collect();
        assert_eq!(ids, vec!["boto", "Tower"]);
    }

    #[test]
    fn test_secret_masking_regex_replaces_defaults() {
        let config = config_from(&[("LUMIGO_SECRET_MASKING_REGEX", r#"["^token$"]"#)]);
        assert_eq!(
            config.secret_masking_regex(),
            Some(&["^token$".to_string()][..])
        );

        // A configured empty list is a valid value: it disables scrubbing.
        let config = config_from(&[("LUMIGO_SECRET_MASKING_REGEX", "[]")]);
        assert_eq!(config.secret_masking_regex(), Some(&[][..]));

        // Invalid JSON is treated as absent.
        let config = config_from(&[("LUMIGO_SECRET_MASKING_REGEX", "not-json")]);
        assert_eq!(config.secret_masking_regex(), None);
    }

    #[test]
    fn test_payload_cap_precedence() {
        let config = config_from(&[
            ("OTEL_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT", "100"),
            ("OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT", "200"),
        ]);
        assert_eq!(config.max_payload_size(), 100);

        let config = config_from(&[("OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT", "200")]);
        assert_eq!(config.max_payload_size(), 200);
    }

    #[test]
    fn test_builder_overrides() {
        let mut builder = Config::builder();
        builder
            .set_tracer_token(Some("t_0123456789abcdef01234".to_string()))
            .set_enable_logs(true);
        let config = builder.build();
        assert_eq!(config.tracer_token(), Some("t_0123456789abcdef01234"));
        assert!(config.enable_logs());
    }
}
