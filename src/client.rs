//! Single-request SIRI client.
//!
//! A [`SiriClient`] ties the query builder, the transport and the decoder
//! together and records how long the last request took.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{RequestConfig, Settings};
use crate::error::{SiriError, TransportError};
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::parser::ResponseDecoder;
use crate::query::{
    StopMonitoringQuery, VehicleMonitoringQuery, build_stop_monitoring_url,
    build_vehicle_monitoring_url,
};
use crate::siri::Siri;

/// Result of a request that got past argument validation.
#[derive(Debug)]
pub enum RequestOutcome {
    /// The server answered and the payload decoded.
    Received(Siri),
    /// The server could not be reached or answered with an error status.
    Unreachable(TransportError),
}

impl RequestOutcome {
    pub fn siri(&self) -> Option<&Siri> {
        match self {
            RequestOutcome::Received(siri) => Some(siri),
            RequestOutcome::Unreachable(_) => None,
        }
    }

    pub fn into_siri(self) -> Option<Siri> {
        match self {
            RequestOutcome::Received(siri) => Some(siri),
            RequestOutcome::Unreachable(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TransportError> {
        match self {
            RequestOutcome::Received(_) => None,
            RequestOutcome::Unreachable(e) => Some(e),
        }
    }

    pub fn is_received(&self) -> bool {
        matches!(self, RequestOutcome::Received(_))
    }
}

/// Issues vehicle- and stop-monitoring requests against one SIRI server.
///
/// Requests take `&mut self`, so a client has at most one request in flight.
/// The decoder is shared and may be handed to several clients.
pub struct SiriClient {
    http: Arc<dyn HttpClient>,
    decoder: Arc<ResponseDecoder>,
    vehicle_monitoring_url: String,
    stop_monitoring_url: String,
    config: RequestConfig,
    last_duration: Option<Duration>,
}

impl SiriClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        decoder: Arc<ResponseDecoder>,
        vehicle_monitoring_url: impl Into<String>,
        stop_monitoring_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            decoder,
            vehicle_monitoring_url: vehicle_monitoring_url.into(),
            stop_monitoring_url: stop_monitoring_url.into(),
            config: RequestConfig::default(),
            last_duration: None,
        }
    }

    /// Builds a client with a [`BasicClient`] using the configured timeout.
    pub fn from_settings(
        settings: &Settings,
        decoder: Arc<ResponseDecoder>,
    ) -> Result<Self, TransportError> {
        let http = BasicClient::with_timeout(Duration::from_secs(settings.timeout_secs))?;
        let mut client = Self::new(
            Arc::new(http),
            decoder,
            settings.vehicle_monitoring_url.clone(),
            settings.stop_monitoring_url.clone(),
        );
        client.set_config(settings.request);
        Ok(client)
    }

    pub fn config(&self) -> RequestConfig {
        self.config
    }

    /// Replaces the configuration used by subsequent requests.
    pub fn set_config(&mut self, config: RequestConfig) {
        self.config = config;
    }

    /// Wall-clock duration of the last request in nanoseconds, or 0 if it
    /// failed.
    pub fn last_request_duration_nanos(&self) -> i64 {
        self.last_duration
            .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    pub async fn make_vehicle_monitoring_request(
        &mut self,
        query: &VehicleMonitoringQuery,
    ) -> Result<RequestOutcome, SiriError> {
        self.last_duration = None;
        let start = Instant::now();
        let url = build_vehicle_monitoring_url(
            &self.vehicle_monitoring_url,
            self.config.response_format,
            query,
        )?;
        self.perform(start, url).await
    }

    pub async fn make_stop_monitoring_request(
        &mut self,
        query: &StopMonitoringQuery,
    ) -> Result<RequestOutcome, SiriError> {
        self.last_duration = None;
        let start = Instant::now();
        let url = build_stop_monitoring_url(
            &self.stop_monitoring_url,
            self.config.response_format,
            query,
        )?;
        self.perform(start, url).await
    }

    #[tracing::instrument(skip_all, fields(config = %self.config))]
    async fn perform(&mut self, start: Instant, url: String) -> Result<RequestOutcome, SiriError> {
        debug!(url = %url, "Sending SIRI request");

        let config = self.config;
        let bytes = match fetch_bytes(self.http.as_ref(), &url, config.transport).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "SIRI server unreachable");
                return Ok(RequestOutcome::Unreachable(e));
            }
        };

        let siri = self
            .decoder
            .decode(&bytes, config.response_format, config.decoder_mode)?;

        let elapsed = start.elapsed();
        self.last_duration = Some(elapsed);
        debug!(elapsed_ms = elapsed.as_secs_f64() * 1000.0, "SIRI response decoded");
        Ok(RequestOutcome::Received(siri))
    }
}
