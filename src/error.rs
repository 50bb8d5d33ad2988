/// Errors that can occur while building or delivering telemetry.
///
/// None of these escape the public tracking or flush methods. Each entry
/// point logs and discards them, so telemetry can never fail the host
/// operation.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A telemetry item failed to serialize to JSON. The item is skipped;
    /// the rest of the batch is still delivered.
    #[error("serializing telemetry item failed with {0}")]
    SerializeItem(serde_json::Error),

    /// The HTTP client for the transport could not be constructed.
    #[error("building HTTP transport failed with {0}")]
    BuildTransport(reqwest::Error),

    /// Could not complete the HTTP request to the ingestion endpoint.
    #[error("sending upload request failed with {0}")]
    UploadConnection(reqwest::Error),

    /// The fire-and-forget sender thread could not be spawned.
    #[error("dispatching upload thread failed with {0}")]
    UploadDispatch(std::io::Error),

    /// The ingestion service response failed to deserialize from JSON.
    ///
    /// Delivery may have worked, but the response could not be inspected.
    #[error("deserializing upload response failed with {0}")]
    UploadDeserializeResponse(serde_json::Error),

    /// The ingestion service rejected at least part of the batch.
    #[error("upload failed with {0}")]
    Upload(String),
}
