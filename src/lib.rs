//! Application Insights telemetry client for server-side Rust
//! applications.
//!
//! Builds telemetry envelopes for the Application Insights ingestion
//! service, buffers them, and delivers them as newline-delimited JSON
//! batches. Telemetry is strictly best-effort: no tracking or flush call
//! ever returns an error or panics, and transport failures are logged and
//! discarded so instrumentation can never break the operation it observes.
//!
//! # Usage
//!
//! Configure a client with a connection string and track items. The buffer
//! flushes itself when it reaches the configured threshold and on drop.
//!
//! ```no_run
//! use appinsights_telemetry::{DeliveryMode, TelemetryClient, TelemetryConfig};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), appinsights_telemetry::Error> {
//! let config = TelemetryConfig {
//!     connection_string: Some(
//!         "InstrumentationKey=instrumentation;IngestionEndpoint=https://ingestion".into(),
//!     ),
//!     ..TelemetryConfig::default()
//! };
//! let mut client = TelemetryClient::new(&config, DeliveryMode::Blocking)?;
//! client.track_event("checkout-completed", BTreeMap::new());
//! client.flush();
//! # Ok(())
//! # }
//! ```
//!
//! # Correlation
//!
//! Inbound requests carrying a W3C `traceparent` (or legacy `Request-Id`)
//! header can join their telemetry to the caller's trace:
//!
//! ```
//! use appinsights_telemetry::correlation::TraceContext;
//!
//! let ctx = TraceContext::from_headers(
//!     Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"),
//!     None,
//! );
//! assert!(ctx.is_some());
//! ```
//!
//! # Browser telemetry
//!
//! The [`collector`] module parses batches submitted by a browser-side
//! script and routes them through the same client, so client- and
//! server-side telemetry share one pipeline and one trace.
//!
//! # Delivery modes
//!
//! [`DeliveryMode::Blocking`] performs an ordinary POST and inspects the
//! ingestion response; use it from background and batch contexts.
//! [`DeliveryMode::FireAndForget`] dispatches on a detached thread and
//! returns immediately; use it inside request handling where latency
//! matters more than delivery guarantees.

#![deny(unreachable_pub, missing_debug_implementations)]

mod client;
pub mod collector;
mod config;
mod connection_string;
mod convert;
pub mod correlation;
mod error;
pub mod ids;
pub mod models;
mod page_info;
mod transport;

pub use client::{ExceptionInfo, TelemetryClient};
pub use config::{ClientScriptConfig, FeatureFlags, TelemetryConfig};
pub use error::Error;
pub use page_info::PendingPageView;
pub use transport::{Batch, DeliveryMode, HttpTransport, Transport};
