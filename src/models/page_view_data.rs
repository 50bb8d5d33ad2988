use crate::models::{Measurements, Properties};
use serde::Serialize;

/// An instance of PageView represents a generic action on a page like a
/// button click.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewData {
    pub ver: i32,

    /// Independent span id per view.
    pub id: String,

    pub name: String,

    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// The referring URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_uri: Option<String>,

    pub properties: Properties,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}
