use crate::models::{Measurements, Properties};
use serde::Serialize;

/// An instance of PageViewPerformance represents browser page load timings
/// derived from the Navigation Timing API.
///
/// Each named sub-duration is present only when its source measurement was
/// reported; absent measurements are omitted, not defaulted to zero.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewPerformanceData {
    pub ver: i32,

    pub name: String,

    pub url: String,

    pub duration: String,

    pub perf_total: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_connect: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_request: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_processing: Option<String>,

    pub properties: Properties,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}
