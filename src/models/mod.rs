//! Wire-schema types for the ingestion endpoint, one file per telemetry
//! kind.

pub mod context_tag_keys;

mod availability_data;
mod data;
mod data_point;
mod envelope;
mod event_data;
mod exception_data;
mod exception_details;
mod message_data;
mod metric_data;
mod page_view_data;
mod page_view_performance_data;
mod remote_dependency_data;
mod request_data;
mod sanitize;
mod severity_level;

pub use availability_data::*;
pub use data::*;
pub use data_point::*;
pub use envelope::*;
pub use event_data::*;
pub use exception_data::*;
pub use exception_details::*;
pub use message_data::*;
pub use metric_data::*;
pub use page_view_data::*;
pub use page_view_performance_data::*;
pub use remote_dependency_data::*;
pub use request_data::*;
pub(crate) use sanitize::*;
pub use severity_level::*;

pub use context_tag_keys::{ContextTagKey, Tags};

/// Custom properties attached to an item, merged from global and call-site
/// properties.
pub type Properties = std::collections::BTreeMap<String, String>;

/// Custom measurements attached to an item.
pub type Measurements = std::collections::BTreeMap<String, f64>;
