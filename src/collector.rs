//! Intake for telemetry reported by the browser script: payload limits,
//! per-item parsing and routing into the client.

use crate::config::TelemetryConfig;
use crate::models::{Measurements, Properties};
use crate::TelemetryClient;
use serde::Deserialize;
use tracing::warn;

/// Rejection of a browser payload. These map to the only error responses
/// the browser script ever sees; its reaction is to retry later, never to
/// surface anything to the end user.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("empty payload")]
    EmptyPayload,
    #[error("invalid payload")]
    InvalidJson,
}

impl CollectorError {
    /// HTTP status code for the response.
    pub fn status_code(&self) -> u16 {
        match self {
            CollectorError::PayloadTooLarge => 413,
            CollectorError::EmptyPayload | CollectorError::InvalidJson => 400,
        }
    }
}

/// A single telemetry item as submitted by the browser script,
/// discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CollectorItem {
    #[serde(rename = "event")]
    Event {
        name: String,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename = "pageView")]
    PageView {
        #[serde(default = "default_page_name")]
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        properties: Properties,
        #[serde(default)]
        measurements: Measurements,
    },
    #[serde(rename = "metric")]
    Metric {
        #[serde(default = "default_metric_name")]
        name: String,
        #[serde(default)]
        value: f64,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename = "exception")]
    Exception {
        error: BrowserError,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename = "browserTimings")]
    BrowserTimings {
        #[serde(default = "default_page_name")]
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        measurements: Measurements,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename = "dependency")]
    Dependency {
        #[serde(default = "default_dependency_name")]
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        duration: f64,
        #[serde(default = "default_true")]
        success: bool,
        #[serde(default, rename = "responseCode")]
        response_code: Option<serde_json::Value>,
        #[serde(default)]
        properties: Properties,
    },
}

/// Error description inside an `exception` item.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BrowserError {
    #[serde(default = "default_error_message")]
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub lineno: Option<i64>,
    #[serde(default)]
    pub colno: Option<i64>,
}

fn default_page_name() -> String {
    "Page View".into()
}

fn default_metric_name() -> String {
    "Unknown Metric".into()
}

fn default_dependency_name() -> String {
    "HTTP Request".into()
}

fn default_error_message() -> String {
    "Unknown JS error".into()
}

fn default_true() -> bool {
    true
}

/// Parse a browser payload into telemetry items.
///
/// The body may be a single item object or an array of items. Oversized
/// bodies are rejected with 413, empty or non-JSON bodies with 400.
/// Batches over the item ceiling are truncated silently. A malformed or
/// unknown-type item is skipped on its own and never fails the batch.
pub fn parse_batch(body: &str, config: &TelemetryConfig) -> Result<Vec<CollectorItem>, CollectorError> {
    if body.len() > config.max_collector_payload_bytes {
        return Err(CollectorError::PayloadTooLarge);
    }
    if body.trim().is_empty() {
        return Err(CollectorError::EmptyPayload);
    }

    let payload: serde_json::Value =
        serde_json::from_str(body).map_err(|_| CollectorError::InvalidJson)?;
    let mut values = match payload {
        serde_json::Value::Array(values) => values,
        value => vec![value],
    };
    if values.is_empty() {
        return Err(CollectorError::EmptyPayload);
    }

    if values.len() > config.max_collector_batch_items {
        warn!(
            received = values.len(),
            limit = config.max_collector_batch_items,
            "batch size exceeded limit, truncating"
        );
        values.truncate(config.max_collector_batch_items);
    }

    let mut items = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<CollectorItem>(value) {
            Ok(item) => items.push(item),
            Err(err) => warn!("skipping unrecognized telemetry item: {}", err),
        }
    }
    Ok(items)
}

/// Route parsed items into the client's tracking calls, honoring the
/// client-side feature flags. Browser-supplied correlation ids found in
/// item properties are adopted into the client's context tags so the
/// resulting envelopes join the originating page's trace.
pub fn dispatch(client: &mut TelemetryClient, config: &TelemetryConfig, items: Vec<CollectorItem>) {
    if !config.client.enabled {
        return;
    }

    for item in items {
        adopt_correlation(client, item_properties(&item));
        match item {
            CollectorItem::Event { name, properties } => {
                client.track_event(&name, properties);
            }
            CollectorItem::PageView {
                name,
                url,
                properties,
                measurements,
            } => {
                client.track_page_view(&name, &url, None, None, properties, measurements);
            }
            CollectorItem::Metric {
                name,
                value,
                properties,
            } => {
                client.track_metric(&name, value, None, None, None, None, None, properties);
            }
            CollectorItem::Exception { error, mut properties } => {
                if let Some(filename) = &error.filename {
                    properties.insert("filename".into(), filename.clone());
                }
                if let Some(lineno) = error.lineno {
                    properties.insert("lineno".into(), lineno.to_string());
                }
                if let Some(colno) = error.colno {
                    properties.insert("colno".into(), colno.to_string());
                }
                client.track_client_exception(&error.message, error.stack.as_deref(), properties);
            }
            CollectorItem::BrowserTimings {
                name,
                url,
                measurements,
                properties,
            } => {
                client.track_browser_timings(&name, &url, measurements, properties);
            }
            CollectorItem::Dependency {
                name,
                url,
                duration,
                success,
                response_code,
                mut properties,
            } => {
                if !config.client.track_dependencies {
                    continue;
                }
                let target = dependency_target(&url);
                let name = if config.client.normalize_dependency_urls {
                    normalize_dependency_name(&name)
                } else {
                    name
                };
                let result_code = response_code.map(json_value_to_string);
                properties.insert("url".into(), url);
                client.track_dependency(
                    "HTTP",
                    &target,
                    &name,
                    duration,
                    success,
                    result_code.as_deref(),
                    None,
                    properties,
                    Measurements::new(),
                );
            }
        }
    }
}

fn item_properties(item: &CollectorItem) -> &Properties {
    match item {
        CollectorItem::Event { properties, .. }
        | CollectorItem::PageView { properties, .. }
        | CollectorItem::Metric { properties, .. }
        | CollectorItem::Exception { properties, .. }
        | CollectorItem::BrowserTimings { properties, .. }
        | CollectorItem::Dependency { properties, .. } => properties,
    }
}

fn adopt_correlation(client: &mut TelemetryClient, properties: &Properties) {
    if let Some(operation_id) = properties.get("operationId") {
        client.set_context_tag(
            crate::models::context_tag_keys::OPERATION_ID,
            operation_id.clone(),
        );
    }
    if let Some(parent_id) = properties.get("parentId") {
        client.set_parent_id(parent_id.clone());
    }
}

/// Host component of a dependency URL, for the Application Map target.
fn dependency_target(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_else(|| "unknown".into())
}

/// Strip the query string and collapse numeric path segments so call
/// variants group under one dependency name.
fn normalize_dependency_name(name: &str) -> String {
    match url::Url::parse(name) {
        Ok(url) => {
            let path: Vec<String> = url
                .path_segments()
                .map(|segments| {
                    segments
                        .map(|s| {
                            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                                "{id}".to_owned()
                            } else {
                                s.to_owned()
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            format!(
                "{}://{}/{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                path.join("/")
            )
        }
        // Relative or non-URL names are grouped as-is, minus any query.
        Err(_) => name.split('?').next().unwrap_or(name).to_owned(),
    }
}

fn json_value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TelemetryConfig {
        TelemetryConfig::default()
    }

    #[test]
    fn single_object_is_a_batch_of_one() {
        let items =
            parse_batch(r#"{"type":"event","name":"clicked","properties":{"a":"1"}}"#, &config())
                .unwrap();
        assert_eq!(1, items.len());
        assert!(matches!(&items[0], CollectorItem::Event { name, .. } if name == "clicked"));
    }

    #[test]
    fn array_payload_parses_each_item() {
        let body = r#"[
            {"type":"event","name":"a"},
            {"type":"metric","name":"m","value":2.5},
            {"type":"pageView","name":"Home","url":"https://h/"}
        ]"#;
        let items = parse_batch(body, &config()).unwrap();
        assert_eq!(3, items.len());
    }

    #[test]
    fn empty_body_is_rejected_with_400() {
        let err = parse_batch("", &config()).unwrap_err();
        assert_eq!(CollectorError::EmptyPayload, err);
        assert_eq!(400, err.status_code());

        let err = parse_batch("[]", &config()).unwrap_err();
        assert_eq!(CollectorError::EmptyPayload, err);
    }

    #[test]
    fn oversized_body_is_rejected_with_413() {
        let body = format!(r#"{{"type":"event","name":"{}"}}"#, "x".repeat(200_000));
        let err = parse_batch(&body, &config()).unwrap_err();
        assert_eq!(CollectorError::PayloadTooLarge, err);
        assert_eq!(413, err.status_code());
    }

    #[test]
    fn non_json_body_is_rejected_with_400() {
        let err = parse_batch("not json", &config()).unwrap_err();
        assert_eq!(CollectorError::InvalidJson, err);
        assert_eq!(400, err.status_code());
    }

    #[test]
    fn oversized_batch_is_truncated_silently() {
        let items: Vec<String> = (0..60)
            .map(|i| format!(r#"{{"type":"event","name":"e{}"}}"#, i))
            .collect();
        let body = format!("[{}]", items.join(","));
        let parsed = parse_batch(&body, &config()).unwrap();
        assert_eq!(50, parsed.len());
    }

    #[test]
    fn malformed_item_is_skipped_not_fatal() {
        let body = r#"[
            {"type":"event","name":"good"},
            {"type":"whatIsThis","name":"bad"},
            {"no_type_at_all":true},
            {"type":"metric","name":"m","value":1}
        ]"#;
        let items = parse_batch(body, &config()).unwrap();
        assert_eq!(2, items.len());
    }

    #[test]
    fn exception_item_defaults_missing_fields() {
        let items = parse_batch(r#"{"type":"exception","error":{"stack":"at x"}}"#, &config())
            .unwrap();
        match &items[0] {
            CollectorItem::Exception { error, .. } => {
                assert_eq!("Unknown JS error", error.message);
                assert_eq!(Some("at x".to_owned()), error.stack);
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn dependency_target_is_the_host() {
        assert_eq!("api.example.com", dependency_target("https://api.example.com/v1/users?x=1"));
        assert_eq!("unknown", dependency_target("not a url"));
    }

    #[test]
    fn dependency_names_are_normalized_for_grouping() {
        assert_eq!(
            "https://api.example.com/users/{id}/orders",
            normalize_dependency_name("https://api.example.com/users/123/orders?page=2")
        );
        assert_eq!("/api/users", normalize_dependency_name("/api/users?page=2"));
    }
}
