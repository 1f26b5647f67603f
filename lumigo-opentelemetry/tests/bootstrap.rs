// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Bootstrap behavior driven through the environment.

use opentelemetry::trace::{Span as _, Tracer, TracerProvider as _};

#[test]
fn switched_off_init_installs_nothing() {
    temp_env::with_vars([("LUMIGO_SWITCH_OFF", Some("true"))], || {
        let providers = lumigo_opentelemetry::init().unwrap();
        assert!(providers.installed_instrumentations.is_empty());
    });
}

#[test]
fn span_dump_receives_spans_even_without_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spandump.jsonl");
    temp_env::with_vars(
        [
            ("LUMIGO_DEBUG_SPANDUMP", Some(path.to_str().unwrap())),
            ("LUMIGO_TRACER_TOKEN", None),
        ],
        || {
            let providers = lumigo_opentelemetry::init().unwrap();
            let tracer = providers.tracer_provider.tracer("test");
            let mut span = tracer.start("dumped-operation");
            span.end();
            providers.tracer_provider.force_flush().unwrap();
        },
    );

    let contents = std::fs::read_to_string(&path).unwrap();
    let line = contents.lines().next().expect("span dump should have a line");
    let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(parsed["name"], "dumped-operation");
    assert!(parsed["context"]["trace_id"].is_string());
}
