use crate::models::{Measurements, Properties};
use serde::Serialize;

/// An instance of Availability represents the result of executing an
/// availability test.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityData {
    pub ver: i32,
    pub id: String,
    pub name: String,
    pub duration: String,
    pub success: bool,
    /// Location where the test ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_location: Option<String>,
    /// Diagnostic message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}
