use crate::models::sanitize::{truncate_chars, Sanitize};
use serde::ser::{Serialize, Serializer};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Value length limit applied to custom tag keys outside the closed
/// vocabulary.
const DEFAULT_TAG_VALUE_LEN: usize = 8192;

/// Key for a context tag attached to every outgoing envelope, carrying the
/// value length limit the ingestion service enforces for it.
///
/// The well-known vocabulary is available as constants. Callers may also
/// attach custom keys via [`ContextTagKey::custom`]; these are accepted
/// rather than rejected to stay forward compatible with new correlation
/// schemes.
#[derive(Debug, Clone)]
pub struct ContextTagKey {
    key: Cow<'static, str>,
    max_value_len: usize,
}

impl ContextTagKey {
    const fn from_static(key: &'static str, max_value_len: usize) -> Self {
        ContextTagKey {
            key: Cow::Borrowed(key),
            max_value_len,
        }
    }

    /// A caller-defined tag key outside the closed vocabulary.
    pub fn custom(key: impl Into<String>) -> Self {
        ContextTagKey {
            key: Cow::Owned(key.into()),
            max_value_len: DEFAULT_TAG_VALUE_LEN,
        }
    }

    /// The raw `ai.*` key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

// Identity is the key string alone, so a custom key with a well-known name
// collides with the constant instead of duplicating it in the tag map.
impl PartialEq for ContextTagKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ContextTagKey {}

impl PartialOrd for ContextTagKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContextTagKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Serialize for ContextTagKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.key)
    }
}

/// Context tags for one envelope or one client instance.
pub type Tags = BTreeMap<ContextTagKey, String>;

/// Application version. Information in the application context fields is
/// always about the application that is sending the telemetry.
pub const APPLICATION_VERSION: ContextTagKey =
    ContextTagKey::from_static("ai.application.ver", 1024);

/// The type of the device the end user of the application is using. Used
/// primarily to distinguish JavaScript telemetry from server side telemetry.
pub const DEVICE_TYPE: ContextTagKey = ContextTagKey::from_static("ai.device.type", 64);

/// The IP address of the client device. IPv4 and IPv6 are supported.
pub const LOCATION_IP: ContextTagKey = ContextTagKey::from_static("ai.location.ip", 46);

/// A unique identifier for the operation instance. All telemetry produced
/// while handling one logical request shares this value; it is what ties a
/// trace together.
pub const OPERATION_ID: ContextTagKey = ContextTagKey::from_static("ai.operation.id", 128);

/// The name (group) of the operation, e.g. 'GET /users/{id}'. Downstream
/// aggregation groups requests by this tag.
pub const OPERATION_NAME: ContextTagKey = ContextTagKey::from_static("ai.operation.name", 1024);

/// The unique identifier of the telemetry item's immediate parent.
pub const OPERATION_PARENT_ID: ContextTagKey =
    ContextTagKey::from_static("ai.operation.parentId", 128);

/// Name of synthetic source, e.g. a web crawler, health check or
/// availability test.
pub const OPERATION_SYNTHETIC_SOURCE: ContextTagKey =
    ContextTagKey::from_static("ai.operation.syntheticSource", 1024);

/// Session ID - the instance of the user's interaction with the app.
pub const SESSION_ID: ContextTagKey = ContextTagKey::from_static("ai.session.id", 64);

/// Anonymous user id. Represents the end user of the application.
pub const USER_ID: ContextTagKey = ContextTagKey::from_static("ai.user.id", 128);

/// Authenticated user id. Since it is PII it is not collected by default.
pub const USER_AUTH_USER_ID: ContextTagKey =
    ContextTagKey::from_static("ai.user.authUserId", 1024);

/// User agent of the browser the telemetry originated from.
pub const USER_AGENT: ContextTagKey = ContextTagKey::from_static("ai.user.userAgent", 2048);

/// Name of the role the application is a part of. Shown on the Application
/// Map.
pub const CLOUD_ROLE: ContextTagKey = ContextTagKey::from_static("ai.cloud.role", 256);

/// Name of the instance where the application is running. Computer name for
/// on-premises, instance name for cloud deployments.
pub const CLOUD_ROLE_INSTANCE: ContextTagKey =
    ContextTagKey::from_static("ai.cloud.roleInstance", 256);

/// SDK version, in `<prefix>:<semver>` form.
pub const INTERNAL_SDK_VERSION: ContextTagKey =
    ContextTagKey::from_static("ai.internal.sdkVersion", 64);

impl Sanitize for Tags {
    fn sanitize(&mut self) {
        for (key, value) in self.iter_mut() {
            truncate_chars(value, key.max_value_len);
        }
    }
}
