//! URL construction for SIRI vehicle- and stop-monitoring requests.
//!
//! Optional parameters use sentinel values for "absent": an empty string for
//! text fields and `-1` for integers. Absent parameters are left out of the
//! query string entirely.

use serde::{Deserialize, Serialize};

use crate::config::ResponseFormat;
use crate::error::SiriError;

/// Integer sentinel for an absent optional parameter.
pub const ABSENT: i32 = -1;

const SEPARATOR: char = '&';

/// Parameters of a vehicle-monitoring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleMonitoringQuery {
    pub dev_key: String,
    pub operator_ref: String,
    pub vehicle_ref: String,
    pub line_ref: String,
    pub direction_ref: i32,
    pub detail_level: String,
    pub max_calls_onwards: i32,
}

/// Parameters of a stop-monitoring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopMonitoringQuery {
    pub dev_key: String,
    pub operator_ref: String,
    pub monitoring_ref: String,
    pub line_ref: String,
    pub direction_ref: i32,
    pub detail_level: String,
    pub max_calls_onwards: i32,
}

impl VehicleMonitoringQuery {
    /// A query for every vehicle of `operator_ref`, all optional fields absent.
    pub fn new(operator_ref: impl Into<String>) -> Self {
        Self {
            dev_key: String::new(),
            operator_ref: operator_ref.into(),
            vehicle_ref: String::new(),
            line_ref: String::new(),
            direction_ref: ABSENT,
            detail_level: String::new(),
            max_calls_onwards: ABSENT,
        }
    }
}

impl StopMonitoringQuery {
    pub fn new(operator_ref: impl Into<String>, monitoring_ref: impl Into<String>) -> Self {
        Self {
            dev_key: String::new(),
            operator_ref: operator_ref.into(),
            monitoring_ref: monitoring_ref.into(),
            line_ref: String::new(),
            direction_ref: ABSENT,
            detail_level: String::new(),
            max_calls_onwards: ABSENT,
        }
    }
}

/// Builds `{base_url}.{json|xml}?...` for a vehicle-monitoring request.
pub fn build_vehicle_monitoring_url(
    base_url: &str,
    format: ResponseFormat,
    query: &VehicleMonitoringQuery,
) -> Result<String, SiriError> {
    let mut url = QueryString::new(base_url, format);

    url.optional("key", &query.dev_key);
    url.required("OperatorRef", &query.operator_ref)?;
    url.optional("VehicleRef", &query.vehicle_ref);
    url.optional("LineRef", &query.line_ref);
    url.direction_ref(query.direction_ref)?;
    url.detail_level("VehicleMonitoringDetailLevel", &query.detail_level)?;
    url.max_calls_onwards(query.max_calls_onwards)?;

    Ok(url.finish())
}

/// Builds `{base_url}.{json|xml}?...` for a stop-monitoring request.
pub fn build_stop_monitoring_url(
    base_url: &str,
    format: ResponseFormat,
    query: &StopMonitoringQuery,
) -> Result<String, SiriError> {
    let mut url = QueryString::new(base_url, format);

    url.optional("key", &query.dev_key);
    url.required("OperatorRef", &query.operator_ref)?;
    url.required("MonitoringRef", &query.monitoring_ref)?;
    url.optional("LineRef", &query.line_ref);
    url.direction_ref(query.direction_ref)?;
    url.detail_level("StopMonitoringDetailLevel", &query.detail_level)?;
    url.max_calls_onwards(query.max_calls_onwards)?;

    Ok(url.finish())
}

/// Accumulates `name=value&` pairs in the fixed parameter order.
struct QueryString {
    buf: String,
}

impl QueryString {
    fn new(base_url: &str, format: ResponseFormat) -> Self {
        let mut buf = String::with_capacity(base_url.len() + 128);
        buf.push_str(base_url);
        buf.push('.');
        buf.push_str(format.extension());
        buf.push('?');
        Self { buf }
    }

    fn push(&mut self, name: &str, value: impl std::fmt::Display) {
        use std::fmt::Write;
        // Writing into a String cannot fail.
        let _ = write!(self.buf, "{name}={value}{SEPARATOR}");
    }

    fn optional(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.push(name, value);
        }
    }

    fn required(&mut self, name: &str, value: &str) -> Result<(), SiriError> {
        if value.is_empty() {
            return Err(SiriError::invalid(format!(
                "{name} is a required parameter and cannot be an empty string"
            )));
        }
        self.push(name, value);
        Ok(())
    }

    fn direction_ref(&mut self, direction_ref: i32) -> Result<(), SiriError> {
        match direction_ref {
            ABSENT => Ok(()),
            0 | 1 => {
                self.push("DirectionRef", direction_ref);
                Ok(())
            }
            other => Err(SiriError::invalid(format!(
                "DirectionRef must be 0 or 1, or -1 if not to be used (got {other})"
            ))),
        }
    }

    /// An absent detail level is still written out as `normal`.
    fn detail_level(&mut self, name: &str, level: &str) -> Result<(), SiriError> {
        if level.is_empty() {
            self.push(name, "normal");
            return Ok(());
        }

        let level = level.to_ascii_lowercase();
        if level != "calls" && level != "normal" {
            return Err(SiriError::invalid(format!(
                "{name} must be 'calls' or 'normal'"
            )));
        }
        self.push(name, level);
        Ok(())
    }

    fn max_calls_onwards(&mut self, max: i32) -> Result<(), SiriError> {
        if max == ABSENT {
            return Ok(());
        }
        if max < 1 {
            return Err(SiriError::invalid(format!(
                "MaximumNumberOfCallsOnwards must be 1 or greater, or -1 if not to be used (got {max})"
            )));
        }
        self.push("MaximumNumberOfCallsOnwards", max);
        Ok(())
    }

    /// Strips the trailing separator, then encodes literal spaces.
    fn finish(mut self) -> String {
        if self.buf.ends_with(SEPARATOR) {
            self.buf.pop();
        }
        self.buf.replace(' ', "%20")
    }
}
