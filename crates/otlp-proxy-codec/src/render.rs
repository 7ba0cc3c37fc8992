//! Structured renderer: decoded batch to a block-style YAML document.
//!
//! Field names follow OTLP/JSON (camelCase, hex trace and span ids). Mapping
//! keys are emitted in sorted order at every level so the same batch always
//! renders to the same bytes.

use crate::codec::DecodedBatch;
use crate::error::RenderError;
use crate::sink::DocumentSink;
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_yaml_ng::{Mapping, Number, Value as YamlValue};

/// Render a decoded batch as a YAML document.
///
/// The document starts with a `---` marker naming the signal so that the
/// output stream is a valid multi-document YAML stream.
pub fn render(batch: &DecodedBatch) -> Result<String, RenderError> {
    let body = match batch {
        DecodedBatch::Traces(req) => to_sorted_yaml(req)?,
        DecodedBatch::Metrics(req) => to_sorted_yaml(req)?,
        DecodedBatch::Logs(req) => to_sorted_yaml(req)?,
    };

    Ok(format!("--- # {}\n{}", batch.kind(), body))
}

/// Render a decoded batch and hand the whole document to `sink` in one write.
pub fn render_to(batch: &DecodedBatch, sink: &dyn DocumentSink) -> Result<(), RenderError> {
    let document = render(batch)?;
    sink.write_document(&document)?;
    Ok(())
}

fn to_sorted_yaml<T: Serialize>(message: &T) -> Result<String, RenderError> {
    let json = serde_json::to_value(message)?;
    Ok(serde_yaml_ng::to_string(&sorted(json))?)
}

fn sorted(value: JsonValue) -> YamlValue {
    match value {
        JsonValue::Null => YamlValue::Null,
        JsonValue::Bool(b) => YamlValue::Bool(b),
        JsonValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                YamlValue::Number(Number::from(u))
            } else if let Some(i) = n.as_i64() {
                YamlValue::Number(Number::from(i))
            } else {
                YamlValue::Number(Number::from(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        JsonValue::String(s) => YamlValue::String(s),
        JsonValue::Array(items) => YamlValue::Sequence(items.into_iter().map(sorted).collect()),
        JsonValue::Object(map) => {
            let mut entries: Vec<(String, JsonValue)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut mapping = Mapping::with_capacity(entries.len());
            for (key, value) in entries {
                mapping.insert(YamlValue::String(key), sorted(value));
            }
            YamlValue::Mapping(mapping)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
    use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
    use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
    use opentelemetry_proto::tonic::metrics::v1::{
        metric, number_data_point, Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics,
    };
    use opentelemetry_proto::tonic::resource::v1::Resource;

    fn string_attr(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(value.to_string())),
            }),
        }
    }

    fn logs_batch() -> DecodedBatch {
        DecodedBatch::Logs(ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                resource: Some(Resource {
                    attributes: vec![
                        string_attr("service.name", "checkout"),
                        string_attr("host.name", "web-1"),
                    ],
                    ..Default::default()
                }),
                scope_logs: vec![ScopeLogs {
                    log_records: vec![LogRecord {
                        severity_text: "WARN".to_string(),
                        body: Some(AnyValue {
                            value: Some(any_value::Value::StringValue("disk almost full".into())),
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        })
    }

    fn metrics_batch() -> DecodedBatch {
        DecodedBatch::Metrics(ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![Metric {
                        name: "queue.depth".to_string(),
                        unit: "1".to_string(),
                        data: Some(metric::Data::Gauge(Gauge {
                            data_points: vec![NumberDataPoint {
                                value: Some(number_data_point::Value::AsInt(17)),
                                ..Default::default()
                            }],
                        })),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        })
    }

    #[test]
    fn test_render_is_deterministic() {
        let batch = logs_batch();
        let first = render(&batch).unwrap();
        let second = render(&batch.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_is_block_style() {
        let document = render(&logs_batch()).unwrap();

        assert!(document.starts_with("--- # logs\n"));
        assert!(document.lines().count() > 5);
        assert!(document.contains("resourceLogs:"));
        assert!(document.contains("disk almost full"));
        assert!(document.contains("service.name"));
        assert!(!document.contains("resourceLogs: ["));
    }

    #[test]
    fn test_render_sorts_keys() {
        let yaml = to_sorted_yaml(&serde_json::json!({
            "zeta": 1,
            "alpha": {"b": true, "a": [1, 2]},
        }))
        .unwrap();

        let alpha = yaml.find("alpha:").unwrap();
        let zeta = yaml.find("zeta:").unwrap();
        assert!(alpha < zeta);
        assert!(yaml.find("a:").unwrap() < yaml.find("b:").unwrap());
    }

    #[test]
    fn test_render_metrics() {
        let document = render(&metrics_batch()).unwrap();
        assert!(document.starts_with("--- # metrics\n"));
        assert!(document.contains("queue.depth"));
        assert!(document.contains("17"));
    }

    #[test]
    fn test_render_to_writes_one_document() {
        let sink = MemorySink::default();
        render_to(&logs_batch(), &sink).unwrap();
        render_to(&metrics_batch(), &sink).unwrap();

        let documents = sink.documents();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0], render(&logs_batch()).unwrap());
    }
}
