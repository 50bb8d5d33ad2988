use crate::models::{ExceptionDetails, Properties};
use serde::Serialize;

/// An instance of Exception represents a handled or unhandled exception that
/// occurred during execution of the monitored application.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionData {
    pub ver: i32,

    /// Exception chain - list of inner exceptions.
    pub exceptions: Vec<ExceptionDetails>,

    pub properties: Properties,
}
