use std::{borrow::Cow, collections::HashMap, convert::TryInto, str::FromStr};

/// Default ingestion host used when a connection string has no
/// `IngestionEndpoint` field.
pub(crate) const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const FIELDS_SEPARATOR: char = ';';
const FIELD_KEY_VALUE_SEPARATOR: char = '=';

#[derive(Debug)]
pub(crate) struct ConnectionString {
    pub(crate) ingestion_endpoint: http::Uri,
    pub(crate) instrumentation_key: String,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ParseError {
    #[error("invalid format")]
    InvalidFormat,
    #[error("missing instrumentation key")]
    MissingInstrumentationKey,
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(http::uri::InvalidUri),
}

impl FromStr for ConnectionString {
    type Err = ParseError;

    /// Parse a semicolon-delimited connection string such as
    /// `InstrumentationKey=xxx;IngestionEndpoint=https://eastus.in.applicationinsights.azure.com/`.
    ///
    /// Unknown fields are ignored. A missing endpoint falls back to the
    /// default ingestion host; a trailing slash on the endpoint is stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields: HashMap<String, String> = s
            .split(FIELDS_SEPARATOR)
            .filter(|kv| !kv.trim().is_empty())
            .map(|kv| {
                let parts: Vec<&str> = kv.split(FIELD_KEY_VALUE_SEPARATOR).collect();
                if parts.len() == 2 {
                    Ok((parts[0].trim().to_lowercase(), parts[1].trim().to_string()))
                } else {
                    Err(ParseError::InvalidFormat)
                }
            })
            .collect::<Result<_, _>>()?;

        let ingestion_endpoint = if let Some(endpoint) = fields.remove("ingestionendpoint") {
            sanitize_url(endpoint)?
        } else {
            http::Uri::from_static(DEFAULT_INGESTION_ENDPOINT)
        };

        let instrumentation_key = fields
            .remove("instrumentationkey")
            .ok_or(ParseError::MissingInstrumentationKey)?;

        Ok(ConnectionString {
            ingestion_endpoint,
            instrumentation_key,
        })
    }
}

fn sanitize_url(url: String) -> Result<http::Uri, ParseError> {
    let new_url: Cow<str> = url.trim().into();
    new_url
        .trim_end_matches('/')
        .try_into()
        .map_err(ParseError::InvalidEndpoint)
}
