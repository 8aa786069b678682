//! Request configuration and client settings.
//!
//! [`RequestConfig`] selects the response format, transport and decoder
//! strategy for a single request. [`Settings`] holds everything the CLI needs
//! to build a client and run a benchmark, loadable from a JSON file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Wire format requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl ResponseFormat {
    /// File extension appended to the base URL.
    pub fn extension(self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Xml => "xml",
        }
    }
}

/// How the HTTP connection is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// The decoder side fetches the URL itself and buffers the whole body.
    #[default]
    Embedded,
    /// An explicit connection with keep-alive disabled; the body is streamed
    /// chunk by chunk to the decoder.
    Explicit,
}

/// Whether the configured mapper is rebuilt per call or shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoderMode {
    SingleShot,
    #[default]
    #[serde(alias = "reusable")]
    ReusableInstance,
}

/// Immutable selection of format, transport and decoder strategy.
///
/// `decoder_mode` only applies to JSON; it is ignored for XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub decoder_mode: DecoderMode,
}

impl RequestConfig {
    pub fn new(
        response_format: ResponseFormat,
        transport: Transport,
        decoder_mode: DecoderMode,
    ) -> Self {
        Self {
            response_format,
            transport,
            decoder_mode,
        }
    }

    /// The decoder mode that actually applies to this configuration.
    pub fn effective_decoder_mode(&self) -> Option<DecoderMode> {
        match self.response_format {
            ResponseFormat::Json => Some(self.decoder_mode),
            ResponseFormat::Xml => None,
        }
    }
}

impl fmt::Display for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {:?} transport",
            self.response_format.extension().to_uppercase(),
            self.transport
        )?;
        if let Some(mode) = self.effective_decoder_mode() {
            write!(f, ", {mode:?} decoder")?;
        }
        Ok(())
    }
}

// Numeric codes are the values stored by older preference files.
impl FromStr for ResponseFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "0" => Ok(ResponseFormat::Json),
            "xml" | "1" => Ok(ResponseFormat::Xml),
            _ => Err(ConfigError::UnknownValue {
                field: "response format",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" | "0" => Ok(Transport::Embedded),
            "explicit" | "1" => Ok(Transport::Explicit),
            _ => Err(ConfigError::UnknownValue {
                field: "transport",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for DecoderMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reusable" | "reusable-instance" | "0" => Ok(DecoderMode::ReusableInstance),
            "single-shot" | "single" | "1" => Ok(DecoderMode::SingleShot),
            _ => Err(ConfigError::UnknownValue {
                field: "decoder mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Client and benchmark settings.
///
/// Every field has a default, so a settings file only needs the values it
/// overrides:
/// ```json
/// {
///   "vehicle_monitoring_url": "http://bustime.mta.info/api/siri/vehicle-monitoring",
///   "request": { "response_format": "xml", "transport": "explicit" },
///   "num_requests": 10,
///   "time_between_requests": 0.5
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_vehicle_monitoring_url")]
    pub vehicle_monitoring_url: String,

    #[serde(default = "default_stop_monitoring_url")]
    pub stop_monitoring_url: String,

    /// Connection-level deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub request: RequestConfig,

    /// Number of sequential requests per benchmark run
    #[serde(default = "default_num_requests")]
    pub num_requests: usize,

    /// Seconds to wait between consecutive requests
    #[serde(default)]
    pub time_between_requests: f64,
}

fn default_vehicle_monitoring_url() -> String {
    "http://bustime.mta.info/api/siri/vehicle-monitoring".to_string()
}

fn default_stop_monitoring_url() -> String {
    "http://bustime.mta.info/api/siri/stop-monitoring".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_num_requests() -> usize {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vehicle_monitoring_url: default_vehicle_monitoring_url(),
            stop_monitoring_url: default_stop_monitoring_url(),
            timeout_secs: default_timeout_secs(),
            request: RequestConfig::default(),
            num_requests: default_num_requests(),
            time_between_requests: 0.0,
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vehicle_monitoring_url.is_empty() && self.stop_monitoring_url.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one monitoring URL must be set".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.num_requests == 0 {
            return Err(ConfigError::Invalid(
                "num_requests must be greater than 0".to_string(),
            ));
        }

        if !self.time_between_requests.is_finite() || self.time_between_requests < 0.0 {
            return Err(ConfigError::Invalid(
                "time_between_requests must be a non-negative number of seconds".to_string(),
            ));
        }

        Ok(())
    }
}
