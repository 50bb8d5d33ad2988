use serde::Serialize;
use serde_repr::Serialize_repr;

/// Metric data single measurement or aggregation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Namespace of the metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,

    /// Name of the metric.
    pub name: String,

    /// Single measurement or the aggregated value.
    pub kind: DataPointKind,

    /// Single value for measurement. Sum of individual measurements for the
    /// aggregation.
    pub value: f64,

    /// Metric weight of the aggregated metric. Forced to 1 for a
    /// measurement.
    pub count: i32,

    /// Minimum value of the aggregated metric. Not set for a measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Maximum value of the aggregated metric. Not set for a measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Standard deviation of the aggregated metric. Not set for a
    /// measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

/// Type of the metric data measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr)]
#[repr(i32)]
pub enum DataPointKind {
    Measurement = 0,
    Aggregation = 1,
}
