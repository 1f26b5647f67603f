// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Debug dump exporters: one JSON object per line, one file per signal.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use opentelemetry::trace::SpanId;
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::trace::SpanData;
use serde_json::{json, Map, Value};

fn open_append(path: &str) -> std::io::Result<Arc<Mutex<File>>> {
    Ok(Arc::new(Mutex::new(
        OpenOptions::new().create(true).append(true).open(path)?,
    )))
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn otel_value_to_json(value: &opentelemetry::Value) -> Value {
    use opentelemetry::{Array, Value as OtelValue};
    match value {
        OtelValue::Bool(b) => json!(b),
        OtelValue::I64(i) => json!(i),
        OtelValue::F64(f) => json!(f),
        OtelValue::String(s) => json!(s.as_str()),
        OtelValue::Array(array) => match array {
            Array::Bool(items) => json!(items),
            Array::I64(items) => json!(items),
            Array::F64(items) => json!(items),
            Array::String(items) => {
                json!(items.iter().map(|s| s.as_str()).collect::<Vec<_>>())
            }
            _ => json!(value.to_string()),
        },
        _ => json!(value.to_string()),
    }
}

fn span_to_json(span: &SpanData) -> Value {
    let attributes: Map<String, Value> = span
        .attributes
        .iter()
        .map(|kv| (kv.key.to_string(), otel_value_to_json(&kv.value)))
        .collect();

    json!({
        "name": span.name.as_ref(),
        "context": {
            "trace_id": format!("0x{}", span.span_context.trace_id()),
            "span_id": format!("0x{}", span.span_context.span_id()),
        },
        "parent_id": if span.parent_span_id == SpanId::INVALID {
            Value::Null
        } else {
            json!(format!("0x{}", span.parent_span_id))
        },
        "kind": format!("{:?}", span.span_kind),
        "attributes": attributes,
        "start_time": unix_nanos(span.start_time),
        "end_time": unix_nanos(span.end_time),
    })
}

/// Writes one JSON object per finished span to a local file.
///
/// The dump intentionally sits outside the no-export filter: spans carrying
/// the `NO_EXPORT` marker still show up here, which is what makes the dump
/// useful when debugging the filter itself.
#[derive(Debug)]
pub struct FileSpanExporter {
    file: Arc<Mutex<File>>,
}

impl FileSpanExporter {
    pub fn create(path: &str) -> std::io::Result<Self> {
        Ok(Self {
            file: open_append(path)?,
        })
    }

    fn write_batch(&self, batch: &[SpanData]) -> OTelSdkResult {
        let mut file = self
            .file
            .lock()
            .map_err(|_| OTelSdkError::InternalFailure("span dump lock poisoned".to_string()))?;
        for span in batch {
            writeln!(file, "{}", span_to_json(span))
                .map_err(|e| OTelSdkError::InternalFailure(e.to_string()))?;
        }
        file.flush()
            .map_err(|e| OTelSdkError::InternalFailure(e.to_string()))
    }
}

impl opentelemetry_sdk::trace::SpanExporter for FileSpanExporter {
    fn export(
        &self,
        batch: Vec<SpanData>,
    ) -> impl std::future::Future<Output = OTelSdkResult> + Send {
        std::future::ready(self.write_batch(&batch))
    }
}

#[cfg(feature = "logs")]
pub use logs::FileLogExporter;

#[cfg(feature = "logs")]
mod logs {
    use super::*;
    use opentelemetry::logs::AnyValue;
    use opentelemetry_sdk::logs::{LogBatch, SdkLogRecord};

    fn any_value_to_json(value: &AnyValue) -> Value {
        match value {
            AnyValue::Int(i) => json!(i),
            AnyValue::Double(d) => json!(d),
            AnyValue::String(s) => json!(s.as_str()),
            AnyValue::Boolean(b) => json!(b),
            _ => json!(format!("{value:?}")),
        }
    }

    fn record_to_json(record: &SdkLogRecord, scope: &opentelemetry::InstrumentationScope) -> Value {
        let attributes: Map<String, Value> = record
            .attributes_iter()
            .map(|(key, value)| (key.to_string(), any_value_to_json(value)))
            .collect();

        json!({
            "timestamp": record.timestamp().map(unix_nanos),
            "observed_timestamp": record.observed_timestamp().map(unix_nanos),
            "severity_text": record.severity_text(),
            "severity_number": record.severity_number().map(|s| s as i32),
            "body": record.body().map(any_value_to_json),
            "attributes": attributes,
            "scope": scope.name(),
        })
    }

    /// Writes one JSON object per emitted log record to a local file.
    #[derive(Debug)]
    pub struct FileLogExporter {
        file: Arc<Mutex<File>>,
    }

    impl FileLogExporter {
        pub fn create(path: &str) -> std::io::Result<Self> {
            Ok(Self {
                file: open_append(path)?,
            })
        }

        fn write_batch(&self, batch: &LogBatch<'_>) -> OTelSdkResult {
            let mut file = self.file.lock().map_err(|_| {
                OTelSdkError::InternalFailure("log dump lock poisoned".to_string())
            })?;
            for (record, scope) in batch.iter() {
                writeln!(file, "{}", record_to_json(record, scope))
                    .map_err(|e| OTelSdkError::InternalFailure(e.to_string()))?;
            }
            file.flush()
                .map_err(|e| OTelSdkError::InternalFailure(e.to_string()))
        }
    }

    impl opentelemetry_sdk::logs::LogExporter for FileLogExporter {
        async fn export(&self, batch: LogBatch<'_>) -> OTelSdkResult {
            self.write_batch(&batch)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use opentelemetry::trace::{SpanContext, Status, TraceFlags, TraceId, TraceState};
    use opentelemetry::KeyValue;

    use super::*;

    fn test_span(attributes: Vec<KeyValue>) -> SpanData {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(60 * 60 * 24 * 365 * 31);
        SpanData {
            span_context: SpanContext::new(
                TraceId::from_bytes([7; 16]),
                opentelemetry::trace::SpanId::from_bytes([3; 8]),
                TraceFlags::SAMPLED,
                false,
                TraceState::default(),
            ),
            parent_span_id: SpanId::INVALID,
            span_kind: opentelemetry::trace::SpanKind::Consumer,
            name: std::borrow::Cow::Borrowed("dump-me"),
            start_time: now,
            end_time: now + Duration::from_millis(5),
            attributes,
            dropped_attributes_count: 0,
            events: opentelemetry_sdk::trace::SpanEvents::default(),
            links: opentelemetry_sdk::trace::SpanLinks::default(),
            status: Status::Unset,
            instrumentation_scope: opentelemetry::InstrumentationScope::builder("test").build(),
        }
    }

    #[test]
    fn test_span_json_shape() {
        let value = span_to_json(&test_span(vec![
            KeyValue::new("http.status_code", 200_i64),
            KeyValue::new("ok", true),
        ]));
        assert_eq!(value["name"], "dump-me");
        assert_eq!(value["kind"], "Consumer");
        assert_eq!(value["parent_id"], Value::Null);
        assert_eq!(value["attributes"]["http.status_code"], 200);
        assert_eq!(value["attributes"]["ok"], true);
        assert!(value["context"]["trace_id"]
            .as_str()
            .unwrap()
            .starts_with("0x"));
        assert!(value["end_time"].as_u64().unwrap() > value["start_time"].as_u64().unwrap());
    }

    #[test]
    fn test_file_exporter_writes_one_line_per_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans.jsonl");
        let exporter = FileSpanExporter::create(path.to_str().unwrap()).unwrap();
        exporter
            .write_batch(&[test_span(vec![]), test_span(vec![])])
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["name"], "dump-me");
        }
    }
}
