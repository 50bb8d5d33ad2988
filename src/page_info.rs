use crate::models::Properties;
use std::time::SystemTime;

/// Short-lived record flashed into the session store at the end of one
/// request and consumed by the next request in the same session to compute
/// a browse-duration message.
///
/// If the follow-up request never happens the record is simply abandoned
/// with the session; nothing here needs cleaning up.
#[derive(Debug, Clone)]
pub struct PendingPageView {
    /// Full URL of the page that was served.
    pub url: String,
    /// When the page finished loading.
    pub load_time: SystemTime,
    /// Request properties captured when the page was served.
    pub properties: Properties,
}

impl PendingPageView {
    pub fn new(url: impl Into<String>, properties: Properties) -> Self {
        Self {
            url: url.into(),
            load_time: SystemTime::now(),
            properties,
        }
    }

    /// Estimated seconds the user spent viewing the page, measured up to
    /// `now`.
    pub fn browse_duration_seconds(&self, now: SystemTime) -> f64 {
        now.duration_since(self.load_time)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
