use crate::models::{Measurements, Properties};
use serde::Serialize;

/// An instance of Request represents completion of an external request to
/// the application to do work and contains a summary of that request
/// execution and the results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub ver: i32,
    /// Span id of this request, distinct from the trace-wide operation id.
    pub id: String,
    pub name: String,
    pub duration: String,
    pub response_code: String,
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}
