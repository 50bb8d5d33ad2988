use crate::models::Properties;
use serde::Serialize;

/// Instances of Event represent structured event records that can be grouped
/// and searched by their properties.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub ver: i32,

    /// Event name. Keep it low cardinality to allow proper grouping.
    pub name: String,

    pub properties: Properties,
}
