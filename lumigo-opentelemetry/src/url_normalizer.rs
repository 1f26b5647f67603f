// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Canonical request URL reassembly from heterogeneous span attributes.
//!
//! Instrumentations disagree on which semantic convention they populate;
//! the sampler needs one canonical endpoint string per span regardless of
//! which generation of attribute names the producing library used.

use std::borrow::Cow;

use opentelemetry::{trace::SpanKind, KeyValue};
use url::Url;

const URL_FULL: &str = "url.full";
const HTTP_URL: &str = "http.url";
const URL_SCHEME: &str = "url.scheme";
const HTTP_SCHEME: &str = "http.scheme";
const HTTP_HOST: &str = "http.host";
const NET_HOST_PORT: &str = "net.host.port";

/// Path material, in order of precedence.
const PATH_KEYS: &[&str] = &["url.path", "http.target", "http.route", "http.path"];

fn attr<'a>(attributes: &'a [KeyValue], key: &str) -> Option<Cow<'a, str>> {
    attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str())
}

fn first_path<'a>(attributes: &'a [KeyValue]) -> Option<Cow<'a, str>> {
    PATH_KEYS.iter().find_map(|key| attr(attributes, key))
}

/// Reassemble a canonical full URL, or `None` when the attributes carry no
/// URL material at all.
pub fn normalize_url(attributes: &[KeyValue]) -> Option<String> {
    let raw = match attr(attributes, URL_FULL).or_else(|| attr(attributes, HTTP_URL)) {
        Some(full) => full.into_owned(),
        None => {
            let host = attr(attributes, HTTP_HOST);
            let path = first_path(attributes);
            if host.is_none() && path.is_none() {
                return None;
            }
            let scheme = attr(attributes, URL_SCHEME)
                .or_else(|| attr(attributes, HTTP_SCHEME))
                .unwrap_or(Cow::Borrowed("http"));
            let netloc = match host {
                Some(h) if h.contains(':') => h.into_owned(),
                Some(h) => match attr(attributes, NET_HOST_PORT) {
                    Some(port) => format!("{h}:{port}"),
                    None => h.into_owned(),
                },
                None => String::new(),
            };
            format!("{scheme}://{netloc}{}", path.unwrap_or_default())
        }
    };

    match Url::parse(&raw) {
        Ok(parsed)
            if (parsed.scheme() == "http" || parsed.scheme() == "https")
                && parsed.host_str().is_some() =>
        {
            // The url crate already collapsed default ports during parsing.
            let mut out = format!(
                "{}://{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default()
            );
            if let Some(port) = parsed.port() {
                out.push(':');
                out.push_str(&port.to_string());
            }
            let path = parsed.path();
            if !path.is_empty() && path != "/" {
                out.push_str(path);
            }
            if let Some(query) = parsed.query() {
                out.push('?');
                out.push_str(query);
            }
            Some(out)
        }
        _ => Some(raw),
    }
}

/// Path-only endpoint for SERVER spans: `path[?query][#fragment]`, drawn
/// from the full URL when one is present, otherwise from the first present
/// path attribute.
pub fn server_endpoint(attributes: &[KeyValue]) -> Option<String> {
    if let Some(full) = attr(attributes, URL_FULL).or_else(|| attr(attributes, HTTP_URL)) {
        if let Ok(parsed) = Url::parse(&full) {
            let mut out = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                out.push('?');
                out.push_str(query);
            }
            if let Some(fragment) = parsed.fragment() {
                out.push('#');
                out.push_str(fragment);
            }
            return Some(out);
        }
        return Some(full.into_owned());
    }
    first_path(attributes).map(Cow::into_owned)
}

/// The endpoint string the sampler matches filters against, per span kind.
pub fn endpoint_for_kind(kind: &SpanKind, attributes: &[KeyValue]) -> Option<String> {
    match kind {
        SpanKind::Server => server_endpoint(attributes),
        _ => normalize_url(attributes),
    }
}
