//! Configuration surface, constructed once at startup and passed into the
//! client and its collaborators.

use std::env;

/// Per-feature enable flags.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    /// Track slow database queries.
    pub db: bool,
    /// Track failed background jobs.
    pub jobs: bool,
    /// Track sent mail.
    pub mail: bool,
    /// Track HTTP requests.
    pub http: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            db: true,
            jobs: true,
            mail: true,
            http: true,
        }
    }
}

/// Browser-side collection flags.
#[derive(Debug, Clone)]
pub struct ClientScriptConfig {
    /// Enable client-side telemetry collection.
    pub enabled: bool,
    /// Track browser-originated HTTP dependencies (XHR/fetch).
    pub track_dependencies: bool,
    /// Strip query strings and ids from dependency URLs for grouping.
    pub normalize_dependency_urls: bool,
}

impl Default for ClientScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_dependencies: true,
            normalize_dependency_urls: true,
        }
    }
}

/// Telemetry configuration.
///
/// An absent or invalid connection string never prevents construction of a
/// client; it only affects delivery.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `InstrumentationKey=...;IngestionEndpoint=...` connection string.
    pub connection_string: Option<String>,
    /// Legacy instrumentation key, used when no connection string is set.
    pub instrumentation_key: Option<String>,
    /// Application id for `Request-Context` browser/server correlation.
    /// This is distinct from the instrumentation key.
    pub application_id: Option<String>,
    /// Seconds to defer flushing to an external queue worker. Zero flushes
    /// in-process.
    pub flush_delay_seconds: u64,
    /// Buffer length at which an append triggers a synchronous flush.
    pub buffer_limit: usize,
    /// Maximum number of URL query parameters kept in request telemetry.
    pub max_query_params: usize,
    /// Maximum length of SQL text kept in dependency telemetry.
    pub max_sql_length: usize,
    /// Only queries slower than this many milliseconds are tracked.
    pub slow_query_threshold_ms: f64,
    pub features: FeatureFlags,
    /// Path patterns excluded from request tracking. `*` wildcards
    /// supported.
    pub excluded_paths: Vec<String>,
    pub client: ClientScriptConfig,
    /// Cloud role name shown on the Application Map.
    pub cloud_role_name: Option<String>,
    /// Instance identifier; defaults to `hostname[-slot]`.
    pub cloud_role_instance: Option<String>,
    /// Application name used as the cloud role fallback.
    pub application_name: Option<String>,
    /// Deployment slot appended to the default role instance, unless it is
    /// `"production"`.
    pub deployment_slot: Option<String>,
    pub application_version: Option<String>,
    /// Collector request body ceiling in bytes; larger payloads are
    /// rejected with 413.
    pub max_collector_payload_bytes: usize,
    /// Collector batch ceiling; larger batches are truncated silently.
    pub max_collector_batch_items: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            instrumentation_key: None,
            application_id: None,
            flush_delay_seconds: 0,
            buffer_limit: 10,
            max_query_params: 10,
            max_sql_length: 1000,
            slow_query_threshold_ms: 500.0,
            features: FeatureFlags::default(),
            excluded_paths: Vec::new(),
            client: ClientScriptConfig::default(),
            cloud_role_name: None,
            cloud_role_instance: None,
            application_name: None,
            deployment_slot: None,
            application_version: None,
            max_collector_payload_bytes: 102_400,
            max_collector_batch_items: 50,
        }
    }
}

impl TelemetryConfig {
    /// Build a configuration from the `MS_AI_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_string: env_string("MS_AI_CONNECTION_STRING"),
            instrumentation_key: env_string("MS_INSTRUMENTATION_KEY"),
            application_id: env_string("MS_AI_APPLICATION_ID"),
            flush_delay_seconds: env_parsed("MS_AI_FLUSH_QUEUE_AFTER_SECONDS")
                .unwrap_or(defaults.flush_delay_seconds),
            max_query_params: env_parsed("MS_AI_MAX_QUERY_PARAMS")
                .unwrap_or(defaults.max_query_params),
            max_sql_length: env_parsed("MS_AI_MAX_SQL_LENGTH").unwrap_or(defaults.max_sql_length),
            slow_query_threshold_ms: env_parsed("MS_AI_DB_SLOW_MS")
                .unwrap_or(defaults.slow_query_threshold_ms),
            features: FeatureFlags {
                db: env_flag("MS_AI_FEATURE_DB").unwrap_or(defaults.features.db),
                jobs: env_flag("MS_AI_FEATURE_JOBS").unwrap_or(defaults.features.jobs),
                mail: env_flag("MS_AI_FEATURE_MAIL").unwrap_or(defaults.features.mail),
                http: env_flag("MS_AI_FEATURE_HTTP").unwrap_or(defaults.features.http),
            },
            client: ClientScriptConfig {
                enabled: env_flag("MS_AI_CLIENT_ENABLED").unwrap_or(defaults.client.enabled),
                track_dependencies: env_flag("MS_AI_CLIENT_TRACK_DEPENDENCIES")
                    .unwrap_or(defaults.client.track_dependencies),
                normalize_dependency_urls: env_flag("MS_AI_CLIENT_NORMALIZE_DEPENDENCY_URLS")
                    .unwrap_or(defaults.client.normalize_dependency_urls),
            },
            cloud_role_name: env_string("MS_AI_CLOUD_ROLE_NAME"),
            cloud_role_instance: env_string("MS_AI_CLOUD_ROLE_INSTANCE"),
            application_name: env_string("APP_NAME"),
            deployment_slot: env_string("WEBSITE_SLOT_NAME"),
            application_version: env_string("MS_AI_APP_VERSION"),
            ..defaults
        }
    }

    /// Whether a request path is excluded from tracking by any configured
    /// pattern.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.excluded_paths
            .iter()
            .any(|pattern| path_matches_pattern(path, pattern))
    }
}

/// Glob-style match of a path against a pattern. `*` matches any run of
/// characters; everything else is literal. Exact matches always pass.
pub(crate) fn path_matches_pattern(path: &str, pattern: &str) -> bool {
    if path == pattern {
        return true;
    }
    if !pattern.contains('*') {
        return false;
    }

    // Match the literal chunks between wildcards in order. A leading or
    // trailing literal chunk must anchor to the respective end.
    let chunks: Vec<&str> = pattern.split('*').collect();
    let mut rest = path;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(chunk) {
                Some(stripped) => rest = stripped,
                None => return false,
            }
        } else if i == chunks.len() - 1 {
            return rest.ends_with(chunk);
        } else {
            match rest.find(chunk) {
                Some(pos) => rest = &rest[pos + chunk.len()..],
                None => return false,
            }
        }
    }
    // Pattern ended with a wildcard (or was all wildcards).
    true
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "on" | "yes"))
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
