//! Delivery of serialized batches to the ingestion endpoint.

use crate::error::Error;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) const TRACK_PATH: &str = "/v2/track";
const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

// Interactive requests must not wait on telemetry; background contexts can
// afford a real round trip.
const BLOCKING_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const BLOCKING_TIMEOUT: Duration = Duration::from_secs(10);
const QUICK_TIMEOUT: Duration = Duration::from_millis(100);

const STATUS_OK: u16 = 200;
const STATUS_PARTIAL_CONTENT: u16 = 206;

/// How a send waits on the ingestion service, chosen by the caller's
/// execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Ordinary POST with multi-second timeouts; the response is inspected
    /// for diagnostics. For background and batch contexts.
    Blocking,
    /// Detached dispatch that returns immediately; some sends may be
    /// dropped by the network stack, accepted in exchange for never
    /// blocking a user-facing response.
    FireAndForget,
}

/// A serialized NDJSON batch handed off by the buffer.
#[derive(Debug, Clone)]
pub struct Batch {
    /// One JSON envelope per line, in insertion order.
    pub body: String,
    /// Number of envelopes serialized into `body`.
    pub item_count: usize,
}

/// Sends serialized batches to the ingestion endpoint.
///
/// Implementations must never block longer than their delivery mode allows;
/// the client logs and discards any error they return.
pub trait Transport: Send + std::fmt::Debug {
    fn send(&self, batch: Batch) -> Result<(), Error>;
}

/// HTTP transport POSTing to `<endpoint>/v2/track?iKey=<key>`.
#[derive(Debug)]
pub struct HttpTransport {
    track_url: String,
    instrumentation_key: String,
    mode: DeliveryMode,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(
        endpoint: &http::Uri,
        instrumentation_key: String,
        mode: DeliveryMode,
    ) -> Result<Self, Error> {
        let client = match mode {
            DeliveryMode::Blocking => reqwest::blocking::Client::builder()
                .connect_timeout(BLOCKING_CONNECT_TIMEOUT)
                .timeout(BLOCKING_TIMEOUT),
            // The send itself runs on a detached thread; the short timeout
            // only bounds how long that thread lingers.
            DeliveryMode::FireAndForget => reqwest::blocking::Client::builder()
                .connect_timeout(QUICK_TIMEOUT)
                .timeout(QUICK_TIMEOUT),
        }
        .build()
        .map_err(Error::BuildTransport)?;

        let track_url = format!("{}{}", endpoint.to_string().trim_end_matches('/'), TRACK_PATH);
        Ok(Self {
            track_url,
            instrumentation_key,
            mode,
            client,
        })
    }

    fn send_blocking(&self, batch: Batch) -> Result<(), Error> {
        let response = self
            .client
            .post(&self.track_url)
            .query(&[("iKey", self.instrumentation_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(batch.body)
            .send()
            .map_err(Error::UploadConnection)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(Error::UploadConnection)?;
        handle_response(status, &body)
    }

    fn send_detached(&self, batch: Batch) -> Result<(), Error> {
        let client = self.client.clone();
        let url = self.track_url.clone();
        let key = self.instrumentation_key.clone();
        std::thread::Builder::new()
            .name("appinsights-send".into())
            .spawn(move || {
                let result = client
                    .post(&url)
                    .query(&[("iKey", key.as_str())])
                    .header(reqwest::header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
                    .body(batch.body)
                    .send();
                match result {
                    Ok(_) => {}
                    // The send was likely initiated before the timeout
                    // fired; the expected outcome in this mode.
                    Err(err) if err.is_timeout() => {
                        debug!("fire-and-forget send dispatched, response not awaited")
                    }
                    Err(err) => debug!("fire-and-forget send failed: {}", err),
                }
            })
            .map_err(Error::UploadDispatch)?;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn send(&self, batch: Batch) -> Result<(), Error> {
        match self.mode {
            DeliveryMode::Blocking => self.send_blocking(batch),
            DeliveryMode::FireAndForget => self.send_detached(batch),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transmission {
    items_received: usize,
    items_accepted: usize,
    #[serde(default)]
    errors: Vec<TransmissionItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionItem {
    status_code: u16,
}

/// Inspect the ingestion response for diagnostics. There is no retry; a
/// failed upload is reported to the caller for logging only, since the
/// buffer has already been cleared.
fn handle_response(status: u16, body: &[u8]) -> Result<(), Error> {
    match status {
        STATUS_OK => Ok(()),
        STATUS_PARTIAL_CONTENT => {
            let content: Transmission =
                serde_json::from_slice(body).map_err(Error::UploadDeserializeResponse)?;
            if content.items_received == content.items_accepted {
                Ok(())
            } else {
                warn!(
                    received = content.items_received,
                    accepted = content.items_accepted,
                    "ingestion service accepted only part of the batch"
                );
                Err(Error::Upload(format!(
                    "{}: {} of {} items accepted",
                    status, content.items_accepted, content.items_received
                )))
            }
        }
        status => Err(Error::Upload(format!(
            "{}: {}",
            status,
            String::from_utf8_lossy(body)
        ))),
    }
}
