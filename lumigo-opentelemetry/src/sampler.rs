// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Endpoint-filtering sampler.
//!
//! Drops spans whose endpoint matches one of the configured URL filter
//! regex lists. The sampler only ever takes the drop decision itself;
//! explicit parent decisions are honored by wrapping it in the SDK's
//! parent-based sampler, see [`parent_based`].

use std::sync::Arc;

use lumigo_trace::{lumigo_warn, Config};
use opentelemetry::trace::{
    Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceId, TraceState,
};
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::{Sampler, ShouldSample};
use regex::Regex;

use crate::url_normalizer::endpoint_for_kind;

#[derive(Debug, Default)]
struct FilterRules {
    regexes: Vec<Regex>,
}

impl FilterRules {
    /// Compile the configured patterns. Invalid patterns are logged once,
    /// at build time, and behave as if they were not set.
    fn from_patterns(name: &str, patterns: &[String]) -> Self {
        let regexes = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    lumigo_warn!("Ignoring invalid pattern {pattern:?} in {name}: {e}");
                    None
                }
            })
            .collect();
        Self { regexes }
    }

    fn matches(&self, endpoint: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(endpoint))
    }
}

/// Sampler dropping spans whose endpoint matches the filter lists read from
/// `LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX` (and its `_SERVER`/`_CLIENT`
/// variants).
#[derive(Debug, Clone)]
pub struct LumigoSampler {
    general: Arc<FilterRules>,
    server: Arc<FilterRules>,
    client: Arc<FilterRules>,
}

impl LumigoSampler {
    pub fn new(config: &Config) -> Self {
        Self {
            general: Arc::new(FilterRules::from_patterns(
                "LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX",
                config.filter_http_endpoints_regex(),
            )),
            server: Arc::new(FilterRules::from_patterns(
                "LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_SERVER",
                config.filter_http_endpoints_regex_server(),
            )),
            client: Arc::new(FilterRules::from_patterns(
                "LUMIGO_FILTER_HTTP_ENDPOINTS_REGEX_CLIENT",
                config.filter_http_endpoints_regex_client(),
            )),
        }
    }

    fn should_drop(&self, span_kind: &SpanKind, endpoint: &str) -> bool {
        // A kind-specific match wins; a match against the other kind's list
        // is not a drop.
        let kind_rules = match span_kind {
            SpanKind::Server => Some(&self.server),
            SpanKind::Client => Some(&self.client),
            _ => None,
        };
        if let Some(rules) = kind_rules {
            if rules.matches(endpoint) {
                return true;
            }
        }
        self.general.matches(endpoint)
    }
}

impl ShouldSample for LumigoSampler {
    fn should_sample(
        &self,
        parent_context: Option<&opentelemetry::Context>,
        _trace_id: TraceId,
        _name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        _links: &[Link],
    ) -> SamplingResult {
        let trace_state = parent_context
            .filter(|cx| cx.has_active_span())
            .map(|cx| cx.span().span_context().trace_state().clone())
            .unwrap_or_else(TraceState::default);

        if let Some(endpoint) = endpoint_for_kind(span_kind, attributes) {
            if self.should_drop(span_kind, &endpoint) {
                return SamplingResult {
                    decision: SamplingDecision::Drop,
                    attributes: Vec::new(),
                    trace_state,
                };
            }
        }

        SamplingResult {
            decision: SamplingDecision::RecordAndSample,
            attributes: Vec::new(),
            trace_state,
        }
    }
}

/// Wrap the endpoint filter in a parent-based sampler so that explicit
/// remote and local parent decisions are honored.
pub fn parent_based(sampler: LumigoSampler) -> Sampler {
    Sampler::ParentBased(Box::new(sampler))
}
