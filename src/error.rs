//! Error types for query building, transport and decoding.

use thiserror::Error;

/// Errors surfaced to callers of [`SiriClient`](crate::client::SiriClient).
///
/// Transport failures are deliberately absent: they are reported through
/// [`RequestOutcome::Unreachable`](crate::client::RequestOutcome) instead.
#[derive(Debug, Error)]
pub enum SiriError {
    /// A request parameter is missing or malformed. Raised before any
    /// network activity.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The response payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl SiriError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Network or connection failures while fetching a response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The URL produced by the query builder could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connecting, sending, or reading the body failed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Failures turning a payload into a [`Siri`](crate::siri::Siri) value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML decode error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document has no `Siri` root element/property.
    #[error("Missing Siri root element")]
    MissingRoot,

    /// The document is well-formed but structurally unusable.
    #[error("Malformed document: {0}")]
    Structure(String),
}

/// Errors loading or validating [`Settings`](crate::config::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Unknown value '{value}' for {field}")]
    UnknownValue { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = SiriError::invalid("OperatorRef is required");
        assert!(err.to_string().contains("OperatorRef is required"));
    }

    #[test]
    fn test_decode_error_converts_into_siri_error() {
        let err: SiriError = DecodeError::MissingRoot.into();
        assert!(matches!(err, SiriError::Decode(DecodeError::MissingRoot)));
        assert_eq!(err.to_string(), "Missing Siri root element");
    }

    #[test]
    fn test_unknown_value_display() {
        let err = ConfigError::UnknownValue {
            field: "transport",
            value: "carrier-pigeon".to_string(),
        };
        assert!(err.to_string().contains("carrier-pigeon"));
        assert!(err.to_string().contains("transport"));
    }
}
