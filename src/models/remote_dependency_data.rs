use crate::models::{Measurements, Properties};
use serde::Serialize;

/// An instance of Remote Dependency represents an interaction of the
/// monitored component with a remote component/service like SQL or an HTTP
/// endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDependencyData {
    pub ver: i32,
    pub id: String,
    pub name: String,
    pub duration: String,
    pub success: bool,
    #[serde(rename = "type")]
    pub type_: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,
    /// Command/URL/query text of the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}
