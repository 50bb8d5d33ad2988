use crate::models::{Properties, SeverityLevel};
use serde::Serialize;

/// Instances of Message represent printf-like trace statements that are
/// text-searched.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub ver: i32,

    /// Trace message
    pub message: String,

    /// Trace severity level.
    pub severity_level: SeverityLevel,

    pub properties: Properties,
}
