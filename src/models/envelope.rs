use crate::models::sanitize::truncate_chars;
use crate::models::{Data, Sanitize, Tags};
use serde::Serialize;

/// One unit of telemetry, immutable once constructed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Schema selector, `Microsoft.ApplicationInsights.<Kind>`.
    pub name: String,

    /// ISO-8601 UTC timestamp, generated at construction.
    pub time: String,

    /// Destination account identifier. May be empty when unconfigured; the
    /// item is still buffered and only delivery is affected.
    pub i_key: String,

    /// Snapshot of the client's context tags at construction time. Later
    /// tag mutations do not retroactively change built envelopes.
    pub tags: Tags,

    /// Kind discriminator plus kind-specific fields.
    pub data: Data,
}

impl Sanitize for Envelope {
    fn sanitize(&mut self) {
        truncate_chars(&mut self.name, 1024);
        self.tags.sanitize();
        self.data.sanitize();
    }
}
