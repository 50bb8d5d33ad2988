use crate::models::{DataPoint, Properties};
use serde::Serialize;

/// An instance of the Metric item is a list of measurements (single data
/// points) and/or aggregations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricData {
    pub ver: i32,

    /// List of metrics. Only one metric in the list is currently supported
    /// by Application Insights storage.
    pub metrics: Vec<DataPoint>,

    pub properties: Properties,
}
