//! End-to-end tests of the tracking methods, asserting on the serialized
//! batches handed to a recording transport.

use appinsights_telemetry::collector;
use appinsights_telemetry::correlation::TraceContext;
use appinsights_telemetry::models::{Measurements, Properties};
use appinsights_telemetry::{Batch, Error, TelemetryClient, TelemetryConfig, Transport};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
struct RecordingTransport {
    batches: Arc<Mutex<Vec<Batch>>>,
}

impl RecordingTransport {
    fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    /// Envelopes of all recorded batches, parsed back from NDJSON.
    fn envelopes(&self) -> Vec<serde_json::Value> {
        let batches = self.batches();
        batches
            .iter()
            .flat_map(|batch| batch.body.lines())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, batch: Batch) -> Result<(), Error> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

#[derive(Debug)]
struct FailingTransport;

impl Transport for FailingTransport {
    fn send(&self, _batch: Batch) -> Result<(), Error> {
        Err(Error::Upload("500: boom".into()))
    }
}

fn client_with(
    config: &TelemetryConfig,
    transport: RecordingTransport,
) -> TelemetryClient {
    TelemetryClient::with_transport(config, "test_key".into(), Box::new(transport))
}

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn buffer_flushes_itself_at_the_threshold() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig {
        buffer_limit: 3,
        ..TelemetryConfig::default()
    };
    let mut client = client_with(&config, transport.clone());

    client.track_event("one", Properties::new());
    client.track_event("two", Properties::new());
    assert!(transport.batches().is_empty());
    assert_eq!(2, client.buffer_len());

    client.track_event("three", Properties::new());
    let batches = transport.batches();
    assert_eq!(1, batches.len());
    assert_eq!(3, batches[0].item_count);
    assert_eq!(3, batches[0].body.lines().count());
    assert_eq!(0, client.buffer_len());
}

#[test]
fn dropping_the_client_flushes_the_remainder() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    {
        let mut client = client_with(&config, transport.clone());
        client.track_event("pending", Properties::new());
        assert!(transport.batches().is_empty());
    }
    let batches = transport.batches();
    assert_eq!(1, batches.len());
    assert_eq!(1, batches[0].item_count);
}

#[test]
fn request_envelope_shape() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    client.track_request(
        "GET /x",
        "https://example.com/x?a=1&b=2",
        150.0,
        200,
        true,
        Properties::new(),
        Measurements::new(),
        None,
    );
    client.flush();

    let envelopes = transport.envelopes();
    assert_eq!(1, envelopes.len());
    let envelope = &envelopes[0];
    assert_eq!("Microsoft.ApplicationInsights.Request", envelope["name"]);
    assert_eq!("test_key", envelope["iKey"]);
    assert_eq!("GET /x", envelope["tags"]["ai.operation.name"]);

    let data = &envelope["data"];
    assert_eq!("RequestData", data["baseType"]);
    let base = &data["baseData"];
    assert_eq!(2, base["ver"]);
    assert_eq!("GET /x", base["name"]);
    assert_eq!("00:00:00.150", base["duration"]);
    assert_eq!("200", base["responseCode"]);
    assert_eq!(true, base["success"]);
    assert_eq!("https://example.com/x", base["url"]);
    assert_eq!(16, base["id"].as_str().unwrap().len());

    let query_params: Properties =
        serde_json::from_str(base["properties"]["query_params"].as_str().unwrap()).unwrap();
    assert_eq!(props(&[("a", "1"), ("b", "2")]), query_params);
}

#[test]
fn metric_without_stats_is_a_measurement() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    client.track_metric("x", 5.0, None, None, None, None, None, Properties::new());
    client.flush();

    let envelope = &transport.envelopes()[0];
    let point = &envelope["data"]["baseData"]["metrics"][0];
    assert_eq!(0, point["kind"]);
    assert_eq!(1, point["count"]);
    assert_eq!(5.0, point["value"]);
    assert!(point.get("min").is_none());
}

#[test]
fn metric_with_stats_is_an_aggregation() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    client.track_metric(
        "x",
        500.0,
        Some(100),
        Some(1.0),
        Some(50.0),
        None,
        None,
        Properties::new(),
    );
    client.flush();

    let envelope = &transport.envelopes()[0];
    let point = &envelope["data"]["baseData"]["metrics"][0];
    assert_eq!(1, point["kind"]);
    assert_eq!(100, point["count"]);
    assert_eq!(1.0, point["min"]);
    assert_eq!(50.0, point["max"]);
    assert!(point.get("stdDev").is_none());
}

#[test]
fn call_site_properties_win_over_globals() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());
    client.set_global_property("env", "production");
    client.set_global_property("region", "eu");

    client.track_event("deploy", props(&[("env", "staging")]));
    client.flush();

    let properties = &transport.envelopes()[0]["data"]["baseData"]["properties"];
    assert_eq!("staging", properties["env"]);
    assert_eq!("eu", properties["region"]);
}

#[test]
fn oversized_multibyte_fields_are_truncated_not_fatal() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    // Values past the sanitization limits, in 3-byte characters so the
    // byte limit falls inside a character.
    let big_value = "€".repeat(3000);
    client.track_event("unicode", props(&[("payload", big_value.as_str())]));
    let long_name = "€".repeat(400);
    client.track_request(
        &long_name,
        "https://example.com/x",
        10.0,
        200,
        true,
        Properties::new(),
        Measurements::new(),
        None,
    );
    client.flush();

    let envelopes = transport.envelopes();
    assert_eq!(2, envelopes.len());

    let payload = envelopes[0]["data"]["baseData"]["properties"]["payload"]
        .as_str()
        .unwrap();
    assert!(payload.len() <= 8192);
    assert!(payload.chars().all(|c| c == '€'));

    let operation_name = envelopes[1]["tags"]["ai.operation.name"].as_str().unwrap();
    assert!(operation_name.len() <= 1024);
    assert!(operation_name.chars().all(|c| c == '€'));
}

#[test]
fn transport_failure_still_clears_the_buffer() {
    let config = TelemetryConfig::default();
    let mut client =
        TelemetryClient::with_transport(&config, "test_key".into(), Box::new(FailingTransport));

    client.track_event("lost", Properties::new());
    client.flush();
    assert_eq!(0, client.buffer_len());
}

#[test]
fn propagated_trace_context_lands_in_the_envelope_tags() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    let ctx = TraceContext::from_headers(
        Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"),
        None,
    )
    .unwrap();
    client.propagate_trace_context(&ctx);
    client.track_event("correlated", Properties::new());
    client.flush();

    let tags = &transport.envelopes()[0]["tags"];
    assert_eq!("0af7651916cd43dd8448eb211c80319c", tags["ai.operation.id"]);
    assert_eq!("b7ad6b7169203331", tags["ai.operation.parentId"]);
}

#[test]
fn exception_with_override_stack_gets_a_synthetic_js_frame() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    client.track_client_exception("boom", Some("Error: boom\n  at onClick"), Properties::new());
    client.flush();

    let details = &transport.envelopes()[0]["data"]["baseData"]["exceptions"][0];
    assert_eq!("Error", details["typeName"]);
    assert_eq!("boom", details["message"]);
    let frame = &details["parsedStack"][0];
    assert_eq!("JS", frame["method"]);
    assert_eq!("JS", frame["assembly"]);
    assert_eq!("Error: boom\n  at onClick", frame["stack"]);
}

#[test]
fn browser_timings_omit_absent_sub_durations() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    let measurements: Measurements = [
        ("pageLoadTime".to_owned(), 1234.0),
        ("serverResponseTime".to_owned(), 300.0),
    ]
    .into_iter()
    .collect();
    client.track_browser_timings("Home", "https://example.com/", measurements, Properties::new());
    client.flush();

    let base = &transport.envelopes()[0]["data"]["baseData"];
    assert_eq!("PageViewPerformanceData", transport.envelopes()[0]["data"]["baseType"]);
    assert_eq!("00:00:01.234", base["duration"]);
    assert_eq!("00:00:00.300", base["receivedResponse"]);
    assert!(base.get("networkConnect").is_none());
    assert!(base.get("domProcessing").is_none());
}

#[test]
fn collector_batch_flows_through_the_client() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut client = client_with(&config, transport.clone());

    let body = r#"[
        {"type":"event","name":"clicked","properties":{"operationId":"0af7651916cd43dd8448eb211c80319c"}},
        {"type":"dependency","name":"https://api.example.com/users/42","url":"https://api.example.com/users/42","duration":120,"success":true,"responseCode":200}
    ]"#;
    let items = collector::parse_batch(body, &config).unwrap();
    collector::dispatch(&mut client, &config, items);
    client.flush();

    let envelopes = transport.envelopes();
    assert_eq!(2, envelopes.len());
    assert_eq!("Microsoft.ApplicationInsights.Event", envelopes[0]["name"]);
    assert_eq!(
        "0af7651916cd43dd8448eb211c80319c",
        envelopes[0]["tags"]["ai.operation.id"]
    );

    let dependency = &envelopes[1]["data"]["baseData"];
    assert_eq!("api.example.com", dependency["target"]);
    assert_eq!("https://api.example.com/users/{id}", dependency["name"]);
    assert_eq!("200", dependency["resultCode"]);
}

#[test]
fn disabled_client_side_collection_drops_the_batch() {
    let transport = RecordingTransport::default();
    let mut config = TelemetryConfig::default();
    config.client.enabled = false;
    let mut client = client_with(&config, transport.clone());

    let items =
        collector::parse_batch(r#"{"type":"event","name":"clicked"}"#, &config).unwrap();
    collector::dispatch(&mut client, &config, items);
    client.flush();

    assert!(transport.batches().is_empty());
    assert_eq!(0, client.buffer_len());
}

#[test]
fn drained_items_can_be_delivered_by_another_client() {
    let transport = RecordingTransport::default();
    let config = TelemetryConfig::default();
    let mut producer = client_with(&config, RecordingTransport::default());
    producer.track_event("queued", Properties::new());

    let items = producer.drain();
    assert_eq!(0, producer.buffer_len());

    let mut worker = client_with(&config, transport.clone());
    worker.enqueue_batch(items);
    worker.flush();

    let envelopes = transport.envelopes();
    assert_eq!(1, envelopes.len());
    assert_eq!("Microsoft.ApplicationInsights.Event", envelopes[0]["name"]);
}
