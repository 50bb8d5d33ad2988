//! Trace-context extraction from inbound request headers and the response
//! headers that let the browser correlate with the server.

/// Header carrying the W3C trace context, `00-<traceid>-<spanid>-<flags>`.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Legacy hierarchical request id header, `|<traceid>.<spanid>...`.
pub const REQUEST_ID_HEADER: &str = "Request-Id";

/// Response header advertising the application id for Application Map
/// correlation.
pub const REQUEST_CONTEXT_HEADER: &str = "Request-Context";

/// Response header echoing the matched route pattern.
pub const ROUTE_PATTERN_HEADER: &str = "X-AI-Route-Pattern";

/// Response header echoing the matched route name.
pub const ROUTE_NAME_HEADER: &str = "X-AI-Route-Name";

/// Trace context derived from an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 32-hex trace-wide operation id.
    pub trace_id: String,
    /// 16-hex id of the caller's span, adopted as the parent id.
    pub span_id: String,
}

impl TraceContext {
    /// Derive the trace context from inbound headers, in priority order:
    /// `traceparent` first, then the legacy `Request-Id`. A malformed header
    /// is treated as absent and falls through to the next rule.
    pub fn from_headers(
        traceparent: Option<&str>,
        request_id: Option<&str>,
    ) -> Option<TraceContext> {
        traceparent
            .and_then(parse_traceparent)
            .or_else(|| request_id.and_then(parse_request_id))
    }
}

/// Parse a W3C `traceparent` value: `00-<32hex traceid>-<16hex spanid>-<flags>`.
///
/// Returns `None` for anything malformed; the caller then starts a new
/// trace.
pub fn parse_traceparent(value: &str) -> Option<TraceContext> {
    let mut parts = value.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    parts.next()?; // flags must be present

    if version.len() != 2 || !is_lower_hex(version) {
        return None;
    }
    if trace_id.len() != 32 || !is_lower_hex(trace_id) || trace_id.chars().all(|c| c == '0') {
        return None;
    }
    if span_id.len() != 16 || !is_lower_hex(span_id) || span_id.chars().all(|c| c == '0') {
        return None;
    }

    Some(TraceContext {
        trace_id: trace_id.to_owned(),
        span_id: span_id.to_owned(),
    })
}

/// Parse a legacy hierarchical `Request-Id` value: `|<traceid>.<spanid>...`.
/// The leading separator is stripped and the first two `.`-separated
/// segments are adopted.
pub fn parse_request_id(value: &str) -> Option<TraceContext> {
    let rest = value.trim().strip_prefix('|')?;
    let mut segments = rest.split('.');
    let trace_id = segments.next().filter(|s| !s.is_empty())?;
    let span_id = segments.next().filter(|s| !s.is_empty())?;
    Some(TraceContext {
        trace_id: trace_id.to_owned(),
        span_id: span_id.to_owned(),
    })
}

/// Value of the `Request-Context` response header for a given application
/// id.
pub fn request_context_value(app_id: &str) -> String {
    format!("appId=cid-v1:{}", app_id)
}

/// Merge the correlation headers into an existing
/// `Access-Control-Expose-Headers` value so the browser script can read
/// them cross-origin.
pub fn merge_expose_headers(existing: &str) -> String {
    let mut headers: Vec<&str> = existing
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .collect();
    for header in [
        REQUEST_CONTEXT_HEADER,
        ROUTE_PATTERN_HEADER,
        ROUTE_NAME_HEADER,
    ] {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(header)) {
            headers.push(header);
        }
    }
    headers.join(", ")
}

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
