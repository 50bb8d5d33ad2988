//! The telemetry client: context tags, payload construction, buffering and
//! flush policy.

use crate::config::TelemetryConfig;
use crate::connection_string::{ConnectionString, DEFAULT_INGESTION_ENDPOINT};
use crate::convert::{format_duration, format_elapsed, now_to_string, split_url};
use crate::correlation::TraceContext;
use crate::error::Error;
use crate::ids;
use crate::models::context_tag_keys::{self as tag_keys, ContextTagKey, Tags};
use crate::models::{
    AvailabilityData, Data, DataPoint, DataPointKind, Envelope, EventData, ExceptionData,
    ExceptionDetails, Measurements, MessageData, MetricData, PageViewData,
    PageViewPerformanceData, Properties, RemoteDependencyData, RequestData, Sanitize,
    SeverityLevel, StackFrame,
};
use crate::page_info::PendingPageView;
use crate::transport::{Batch, DeliveryMode, HttpTransport, Transport};
use std::time::SystemTime;
use tracing::{debug, warn};

/// SDK version reported in the `ai.internal.sdkVersion` tag.
const SDK_VERSION: &str = concat!("rust:", env!("CARGO_PKG_VERSION"));

/// Cloud role fallback when neither a role name nor an application name is
/// configured.
const DEFAULT_CLOUD_ROLE: &str = "app";

/// Description of a caught error, decoupled from any particular error type
/// so callers can report both native errors and reconstructed ones.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Error type name, e.g. `std::io::Error`.
    pub type_name: String,
    pub message: String,
    /// Structured stack frames, if the caller captured any.
    pub frames: Vec<StackFrame>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Describe a typed error, using its type name and display message.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self::new(std::any::type_name::<E>(), error.to_string())
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }
}

/// Telemetry client owning the context tags, the envelope buffer and the
/// flush policy.
///
/// One instance per request/process lifecycle; the buffer is not shared
/// across concurrent requests. None of the tracking methods or [`flush`]
/// return errors or panic: failures at the transport boundary are logged
/// and discarded so telemetry can never disrupt the host operation.
///
/// [`flush`]: TelemetryClient::flush
#[derive(Debug)]
pub struct TelemetryClient {
    instrumentation_key: String,
    tags: Tags,
    global_properties: Properties,
    buffer: Vec<Envelope>,
    buffer_limit: usize,
    max_query_params: usize,
    max_sql_length: usize,
    transport: Box<dyn Transport>,
}

impl TelemetryClient {
    /// Create a client delivering over HTTP in the given mode.
    ///
    /// A missing or invalid connection string leaves the instrumentation
    /// key empty: items are still buffered and only delivery is affected.
    pub fn new(config: &TelemetryConfig, mode: DeliveryMode) -> Result<Self, Error> {
        let (endpoint, instrumentation_key) = resolve_connection(config);
        let transport = HttpTransport::new(&endpoint, instrumentation_key.clone(), mode)?;
        Ok(Self::with_transport(
            config,
            instrumentation_key,
            Box::new(transport),
        ))
    }

    /// Create a client with a caller-supplied transport.
    pub fn with_transport(
        config: &TelemetryConfig,
        instrumentation_key: String,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            instrumentation_key,
            tags: initial_tags(config),
            global_properties: Properties::new(),
            buffer: Vec::new(),
            buffer_limit: config.buffer_limit.max(1),
            max_query_params: config.max_query_params,
            max_sql_length: config.max_sql_length,
            transport,
        }
    }

    /// Set a context tag, overwriting unconditionally. Custom keys are
    /// accepted.
    pub fn set_context_tag(&mut self, key: ContextTagKey, value: impl Into<String>) {
        self.tags.insert(key, value.into());
    }

    pub fn context_tag(&self, key: &ContextTagKey) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The current trace-wide operation id (correlation id).
    pub fn operation_id(&self) -> Option<&str> {
        self.context_tag(&tag_keys::OPERATION_ID)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.context_tag(&tag_keys::OPERATION_PARENT_ID)
    }

    pub fn set_parent_id(&mut self, parent_id: impl Into<String>) {
        self.set_context_tag(tag_keys::OPERATION_PARENT_ID, parent_id);
    }

    /// Set the operation name used by downstream aggregation to group
    /// requests.
    pub fn set_operation_name(&mut self, name: impl Into<String>) {
        self.set_context_tag(tag_keys::OPERATION_NAME, name);
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.context_tag(&tag_keys::OPERATION_NAME)
    }

    pub fn set_authenticated_user_id(&mut self, user_id: impl Into<String>) {
        self.set_context_tag(tag_keys::USER_AUTH_USER_ID, user_id);
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.set_context_tag(tag_keys::SESSION_ID, session_id);
    }

    /// Mark this client's telemetry as synthetic traffic, e.g. "Bot" or
    /// "HealthCheck".
    pub fn set_synthetic_source(&mut self, source: impl Into<String>) {
        self.set_context_tag(tag_keys::OPERATION_SYNTHETIC_SOURCE, source);
    }

    pub fn cloud_role_name(&self) -> Option<&str> {
        self.context_tag(&tag_keys::CLOUD_ROLE)
    }

    pub fn cloud_role_instance(&self) -> Option<&str> {
        self.context_tag(&tag_keys::CLOUD_ROLE_INSTANCE)
    }

    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }

    /// Adopt a trace context extracted from inbound request headers: the
    /// trace id overwrites the operation id and the caller's span id
    /// becomes the parent id.
    pub fn propagate_trace_context(&mut self, context: &TraceContext) {
        self.set_context_tag(tag_keys::OPERATION_ID, context.trace_id.clone());
        self.set_context_tag(tag_keys::OPERATION_PARENT_ID, context.span_id.clone());
    }

    /// Add a property sent with every subsequent item. Call-site properties
    /// win on key collision.
    pub fn set_global_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.global_properties.insert(key.into(), value.into());
    }

    /// Number of items currently buffered.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Track a completed inbound request.
    ///
    /// Also sets the operation-name context tag; without it the portal
    /// shows requests ungrouped. The URL is split into a de-queried base
    /// plus a capped number of query parameters stored as a JSON-encoded
    /// property.
    #[allow(clippy::too_many_arguments)]
    pub fn track_request(
        &mut self,
        name: &str,
        url: &str,
        duration_ms: f64,
        response_code: u16,
        success: bool,
        properties: Properties,
        measurements: Measurements,
        source: Option<&str>,
    ) {
        self.set_operation_name(name);

        let (base_url, query_params) = split_url(url, self.max_query_params);
        let mut properties = self.merged_properties(properties);
        properties.insert("fullUrl".into(), base_url.clone());
        properties.insert(
            "query_params".into(),
            serde_json::to_string(&query_params).unwrap_or_else(|_| "{}".into()),
        );

        self.enqueue(
            "Microsoft.ApplicationInsights.Request",
            Data::Request(RequestData {
                ver: 2,
                // span id, not the operation id: this identifies the item
                id: ids::new_span_id(),
                name: name.into(),
                duration: format_duration(duration_ms),
                response_code: response_code.to_string(),
                success,
                url: base_url,
                source: source.map(Into::into),
                properties,
                measurements: none_if_empty(measurements),
            }),
        );
    }

    /// Track a page view with its own independent item id.
    pub fn track_page_view(
        &mut self,
        name: &str,
        url: &str,
        duration_ms: Option<f64>,
        referred_uri: Option<&str>,
        properties: Properties,
        measurements: Measurements,
    ) {
        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.PageView",
            Data::PageView(PageViewData {
                ver: 2,
                id: ids::new_span_id(),
                name: name.into(),
                url: url.into(),
                duration: duration_ms.map(format_duration),
                referred_uri: referred_uri.map(Into::into),
                properties,
                measurements: none_if_empty(measurements),
            }),
        );
    }

    /// Track a metric, either a single measurement or a pre-aggregated
    /// value.
    ///
    /// Aggregation mode is selected when `count > 1` or any of `min`,
    /// `max`, `std_dev` is given; otherwise this is a measurement with
    /// count forced to 1.
    #[allow(clippy::too_many_arguments)]
    pub fn track_metric(
        &mut self,
        name: &str,
        value: f64,
        count: Option<i32>,
        min: Option<f64>,
        max: Option<f64>,
        std_dev: Option<f64>,
        namespace: Option<&str>,
        properties: Properties,
    ) {
        let is_aggregation =
            count.is_some_and(|c| c > 1) || min.is_some() || max.is_some() || std_dev.is_some();

        let point = if is_aggregation {
            DataPoint {
                ns: namespace.map(Into::into),
                name: name.into(),
                kind: DataPointKind::Aggregation,
                value,
                count: count.unwrap_or(1),
                min,
                max,
                std_dev,
            }
        } else {
            DataPoint {
                ns: namespace.map(Into::into),
                name: name.into(),
                kind: DataPointKind::Measurement,
                value,
                count: 1,
                min: None,
                max: None,
                std_dev: None,
            }
        };

        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.Metric",
            Data::Metric(MetricData {
                ver: 2,
                metrics: vec![point],
                properties,
            }),
        );
    }

    /// Track browser page load performance from Navigation Timing API
    /// measurements. Sub-durations whose source measurement is absent are
    /// omitted.
    pub fn track_browser_timings(
        &mut self,
        name: &str,
        url: &str,
        measurements: Measurements,
        properties: Properties,
    ) {
        let duration = measurements
            .get("pageLoadTime")
            .map(|ms| format_duration(*ms))
            .unwrap_or_else(|| "00:00:00.000".into());
        let sub_duration =
            |key: &str| -> Option<String> { measurements.get(key).map(|ms| format_duration(*ms)) };

        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.PageViewPerformance",
            Data::PageViewPerformance(PageViewPerformanceData {
                ver: 2,
                name: name.into(),
                url: url.into(),
                perf_total: duration.clone(),
                duration,
                network_connect: sub_duration("tcpConnectTime"),
                sent_request: sub_duration("networkLatency"),
                received_response: sub_duration("serverResponseTime"),
                dom_processing: sub_duration("domProcessingTime"),
                properties,
                measurements: none_if_empty(measurements),
            }),
        );
    }

    /// Track a caught error.
    ///
    /// `override_stack` replaces any captured frames with a single
    /// synthetic `"JS"` frame carrying the raw client-reported stack text.
    pub fn track_exception(
        &mut self,
        exception: &ExceptionInfo,
        properties: Properties,
        override_stack: Option<&str>,
    ) {
        let frames = match override_stack {
            Some(stack) => vec![StackFrame {
                level: 0,
                method: "JS".into(),
                assembly: "JS".into(),
                file_name: None,
                line: None,
                stack: Some(stack.into()),
            }],
            None => exception.frames.clone(),
        };

        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.Exception",
            Data::Exception(ExceptionData {
                ver: 2,
                exceptions: vec![ExceptionDetails {
                    id: 1,
                    outer_id: 0,
                    type_name: exception.type_name.clone(),
                    message: exception.message.clone(),
                    has_full_stack: true,
                    stack: serde_json::to_string(&frames).ok(),
                    parsed_stack: frames,
                }],
                properties,
            }),
        );
    }

    /// Track an exception reported by the browser script.
    pub fn track_client_exception(
        &mut self,
        message: &str,
        stack: Option<&str>,
        mut properties: Properties,
    ) {
        if let Some(stack) = stack {
            properties.insert("jsStack".into(), stack.into());
        }
        let info = ExceptionInfo::new("Error", message);
        self.track_exception(&info, properties, stack);
    }

    /// Track a custom event.
    pub fn track_event(&mut self, name: &str, properties: Properties) {
        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.Event",
            Data::Event(EventData {
                ver: 2,
                name: name.into(),
                properties,
            }),
        );
    }

    /// Track a trace message with an explicit severity.
    pub fn track_trace(&mut self, message: &str, severity: SeverityLevel, properties: Properties) {
        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.Message",
            Data::Message(MessageData {
                ver: 2,
                message: message.into(),
                severity_level: severity,
                properties,
            }),
        );
    }

    /// Track a message at Information severity.
    pub fn track_message(&mut self, message: &str, properties: Properties) {
        self.track_trace(message, SeverityLevel::Information, properties);
    }

    /// Track a database query as a SQL dependency. The query text is
    /// truncated at the configured length with a `...` marker; this is
    /// payload-size control, not redaction.
    pub fn track_db_query(&mut self, sql: &str, duration_ms: f64, properties: Properties) {
        let sanitized = truncate_sql(sql, self.max_sql_length);
        let mut properties = self.merged_properties(properties);
        let target = properties
            .get("db.connection")
            .cloned()
            .unwrap_or_else(|| "database".into());
        properties.insert("db.sql".into(), sanitized.clone());
        properties.insert("db.duration_ms".into(), format!("{}", duration_ms));

        self.enqueue(
            "Microsoft.ApplicationInsights.RemoteDependency",
            Data::RemoteDependency(RemoteDependencyData {
                ver: 2,
                id: ids::new_span_id(),
                name: "SQL Query".into(),
                duration: format_duration(duration_ms),
                success: true,
                type_: "SQL".into(),
                target,
                result_code: None,
                data: Some(sanitized),
                properties,
                measurements: None,
            }),
        );
    }

    /// Track an outbound dependency call (HTTP, SQL, cache, ...).
    #[allow(clippy::too_many_arguments)]
    pub fn track_dependency(
        &mut self,
        type_: &str,
        target: &str,
        name: &str,
        duration_ms: f64,
        success: bool,
        result_code: Option<&str>,
        data: Option<&str>,
        properties: Properties,
        measurements: Measurements,
    ) {
        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.RemoteDependency",
            Data::RemoteDependency(RemoteDependencyData {
                ver: 2,
                id: ids::new_span_id(),
                name: name.into(),
                duration: format_duration(duration_ms),
                success,
                type_: type_.into(),
                target: target.into(),
                result_code: result_code.map(Into::into),
                data: data.map(Into::into),
                properties,
                measurements: none_if_empty(measurements),
            }),
        );
    }

    /// Track an availability test result.
    #[allow(clippy::too_many_arguments)]
    pub fn track_availability(
        &mut self,
        name: &str,
        duration_ms: f64,
        success: bool,
        run_location: Option<&str>,
        message: Option<&str>,
        properties: Properties,
        measurements: Measurements,
    ) {
        let properties = self.merged_properties(properties);
        self.enqueue(
            "Microsoft.ApplicationInsights.Availability",
            Data::Availability(AvailabilityData {
                ver: 2,
                id: ids::new_span_id(),
                name: name.into(),
                duration: format_duration(duration_ms),
                success,
                run_location: run_location.map(Into::into),
                message: message.map(Into::into),
                properties,
                measurements: none_if_empty(measurements),
            }),
        );
    }

    /// Track how long the user spent viewing the previous page, from a
    /// [`PendingPageView`] flashed by the preceding request.
    pub fn track_browse_duration(&mut self, page: &PendingPageView) {
        let seconds = page.browse_duration_seconds(SystemTime::now());
        let mut properties = page.properties.clone();
        properties.insert("url".into(), page.url.clone());
        properties.insert("duration".into(), format!("{:.2}", seconds));
        properties.insert("duration_formatted".into(), format_elapsed(seconds));
        self.track_message("browse_duration", properties);
    }

    /// Take the buffered envelopes for an external delivery path, e.g. a
    /// deferred queue worker. The serialized item list is the only state
    /// crossing that boundary.
    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.buffer)
    }

    /// Append pre-built envelopes, e.g. on the queue-worker side of a
    /// deferred flush. Triggers the same auto-flush policy as the tracking
    /// methods.
    pub fn enqueue_batch(&mut self, items: Vec<Envelope>) {
        if items.is_empty() {
            return;
        }
        self.buffer.extend(items);
        if self.buffer.len() >= self.buffer_limit {
            self.flush();
        }
    }

    /// Serialize the buffer to newline-delimited JSON, hand it to the
    /// transport and clear the buffer.
    ///
    /// The buffer is cleared even when the transport fails: telemetry is
    /// best-effort, and holding failed items would grow without bound
    /// during a sustained outage. An item that fails to serialize is
    /// skipped on its own, never taking the batch with it.
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let mut lines = Vec::with_capacity(self.buffer.len());
        for envelope in &self.buffer {
            match serde_json::to_string(envelope) {
                Ok(line) => lines.push(line),
                Err(err) => warn!(
                    "skipping telemetry item: {}",
                    Error::SerializeItem(err)
                ),
            }
        }
        self.buffer.clear();

        if lines.is_empty() {
            return;
        }
        let batch = Batch {
            item_count: lines.len(),
            body: lines.join("\n"),
        };
        if let Err(err) = self.transport.send(batch) {
            debug!("telemetry flush failed: {}", err);
        }
    }

    fn merged_properties(&self, properties: Properties) -> Properties {
        let mut merged = self.global_properties.clone();
        merged.extend(properties);
        merged
    }

    fn enqueue(&mut self, name: &str, data: Data) {
        let mut envelope = Envelope {
            name: name.into(),
            time: now_to_string(),
            i_key: self.instrumentation_key.clone(),
            tags: self.tags.clone(),
            data,
        };
        envelope.sanitize();
        self.buffer.push(envelope);
        if self.buffer.len() >= self.buffer_limit {
            self.flush();
        }
    }
}

impl Drop for TelemetryClient {
    /// Flush whatever is left at the end of the client's lifetime, so
    /// normal termination does not lose buffered items.
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.flush();
        }
    }
}

fn resolve_connection(config: &TelemetryConfig) -> (http::Uri, String) {
    if let Some(connection_string) = &config.connection_string {
        match connection_string.parse::<ConnectionString>() {
            Ok(parsed) => return (parsed.ingestion_endpoint, parsed.instrumentation_key),
            Err(err) => warn!("invalid connection string: {}", err),
        }
    }
    if let Some(key) = &config.instrumentation_key {
        warn!("instrumentation_key is deprecated; configure a connection string instead");
        return (
            http::Uri::from_static(DEFAULT_INGESTION_ENDPOINT),
            key.clone(),
        );
    }
    (http::Uri::from_static(DEFAULT_INGESTION_ENDPOINT), String::new())
}

fn initial_tags(config: &TelemetryConfig) -> Tags {
    let mut tags = Tags::new();
    tags.insert(tag_keys::OPERATION_ID, ids::new_trace_id());

    let role = config
        .cloud_role_name
        .clone()
        .or_else(|| config.application_name.clone())
        .unwrap_or_else(|| DEFAULT_CLOUD_ROLE.into());
    tags.insert(tag_keys::CLOUD_ROLE, role);

    let instance = config.cloud_role_instance.clone().unwrap_or_else(|| {
        let mut instance = sysinfo::System::host_name().unwrap_or_else(|| "unknown".into());
        if let Some(slot) = config.deployment_slot.as_deref() {
            if !slot.is_empty() && slot != "production" {
                instance = format!("{}-{}", instance, slot);
            }
        }
        instance
    });
    tags.insert(tag_keys::CLOUD_ROLE_INSTANCE, instance);

    tags.insert(
        tag_keys::APPLICATION_VERSION,
        config
            .application_version
            .clone()
            .unwrap_or_else(|| "1.0.0".into()),
    );
    tags.insert(tag_keys::INTERNAL_SDK_VERSION, SDK_VERSION.into());
    tags.insert(tag_keys::DEVICE_TYPE, "PC".into());
    tags
}

fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.chars().count() > max_len {
        let mut truncated: String = sql.chars().take(max_len).collect();
        truncated.push_str("...");
        truncated
    } else {
        sql.to_owned()
    }
}

fn none_if_empty(measurements: Measurements) -> Option<Measurements> {
    Some(measurements).filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_is_truncated_with_marker() {
        let long = "SELECT ".repeat(300);
        let truncated = truncate_sql(&long, 1000);
        assert_eq!(1003, truncated.chars().count());
        assert!(truncated.ends_with("..."));
        assert_eq!(long, truncate_sql(&long, 5000));
    }

    #[test]
    fn initial_tags_follow_config_fallbacks() {
        let config = TelemetryConfig {
            cloud_role_name: None,
            application_name: Some("billing".into()),
            cloud_role_instance: Some("server-1".into()),
            application_version: None,
            ..TelemetryConfig::default()
        };
        let tags = initial_tags(&config);
        assert_eq!("billing", tags[&tag_keys::CLOUD_ROLE]);
        assert_eq!("server-1", tags[&tag_keys::CLOUD_ROLE_INSTANCE]);
        assert_eq!("1.0.0", tags[&tag_keys::APPLICATION_VERSION]);
        assert_eq!("PC", tags[&tag_keys::DEVICE_TYPE]);
        assert_eq!(32, tags[&tag_keys::OPERATION_ID].len());
    }

    #[test]
    fn production_slot_is_not_appended() {
        let config = TelemetryConfig {
            deployment_slot: Some("production".into()),
            ..TelemetryConfig::default()
        };
        let tags = initial_tags(&config);
        assert!(!tags[&tag_keys::CLOUD_ROLE_INSTANCE].ends_with("-production"));

        let config = TelemetryConfig {
            deployment_slot: Some("staging".into()),
            ..TelemetryConfig::default()
        };
        let tags = initial_tags(&config);
        assert!(tags[&tag_keys::CLOUD_ROLE_INSTANCE].ends_with("-staging"));
    }

    #[test]
    fn connection_resolution_prefers_connection_string() {
        let config = TelemetryConfig {
            connection_string: Some(
                "InstrumentationKey=cs_key;IngestionEndpoint=https://ingest".into(),
            ),
            instrumentation_key: Some("legacy_key".into()),
            ..TelemetryConfig::default()
        };
        let (endpoint, key) = resolve_connection(&config);
        assert_eq!("https://ingest", endpoint.to_string().trim_end_matches('/'));
        assert_eq!("cs_key", key);
    }

    #[test]
    fn missing_configuration_still_resolves() {
        let (endpoint, key) = resolve_connection(&TelemetryConfig::default());
        assert_eq!(DEFAULT_INGESTION_ENDPOINT, endpoint.to_string().trim_end_matches('/'));
        assert_eq!("", key);
    }
}
