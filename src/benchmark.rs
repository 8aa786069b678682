//! Sequential benchmarking of SIRI requests.
//!
//! [`run`] issues a fixed number of requests one after another and yields a
//! [`Sample`] per request as a lazy stream. [`collect`] drains that stream
//! into a [`BenchmarkResult`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_stream::try_stream;
use futures::{Stream, StreamExt, pin_mut};
use tracing::{debug, info};

use crate::client::{RequestOutcome, SiriClient};
use crate::error::{SiriError, TransportError};
use crate::query::{StopMonitoringQuery, VehicleMonitoringQuery};
use crate::stats::LatencySummary;

/// The request repeated by a benchmark run.
#[derive(Debug, Clone)]
pub enum MonitoringRequest {
    Vehicle(VehicleMonitoringQuery),
    Stop(StopMonitoringQuery),
}

impl MonitoringRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            MonitoringRequest::Vehicle(_) => "vehicle-monitoring",
            MonitoringRequest::Stop(_) => "stop-monitoring",
        }
    }

    pub async fn send(&self, client: &mut SiriClient) -> Result<RequestOutcome, SiriError> {
        match self {
            MonitoringRequest::Vehicle(q) => client.make_vehicle_monitoring_request(q).await,
            MonitoringRequest::Stop(q) => client.make_stop_monitoring_request(q).await,
        }
    }
}

/// One completed request.
#[derive(Debug)]
pub struct Sample {
    /// Zero-based position in the run.
    pub index: usize,
    /// Elapsed time in milliseconds; `0.0` when the server was unreachable.
    pub latency_ms: f64,
    pub outcome: RequestOutcome,
}

impl Sample {
    pub fn failure(&self) -> Option<&TransportError> {
        self.outcome.failure()
    }
}

/// Cooperative cancellation flag shared between a benchmark and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs `count` requests in sequence, sleeping `delay_secs` between them.
///
/// `is_cancelled` is consulted after every request; once it returns `true`
/// the stream ends with the samples produced so far. A transport failure
/// produces a sample, any other error is yielded once and ends the stream.
pub fn run<'a, F>(
    client: &'a mut SiriClient,
    request: &'a MonitoringRequest,
    count: usize,
    delay_secs: f64,
    is_cancelled: F,
) -> impl Stream<Item = Result<Sample, SiriError>> + 'a
where
    F: Fn() -> bool + 'a,
{
    let delay = delay_from_secs(delay_secs);

    try_stream! {
        info!(kind = request.kind(), count, delay_secs, config = %client.config(), "Starting benchmark");

        for index in 0..count {
            let outcome = request.send(client).await?;
            let latency_ms = client.last_request_duration_nanos() as f64 / 1_000_000.0;
            debug!(index, latency_ms, received = outcome.is_received(), "Request completed");

            yield Sample { index, latency_ms, outcome };

            if is_cancelled() {
                info!(completed = index + 1, count, "Benchmark cancelled");
                break;
            }

            if index + 1 < count && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Negative and NaN delays mean no delay; delays too large for a
/// [`Duration`] (including infinity) saturate to [`Duration::MAX`].
fn delay_from_secs(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(delay) => delay,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

/// Drains [`run`] into a [`BenchmarkResult`].
pub async fn collect<F>(
    client: &mut SiriClient,
    request: &MonitoringRequest,
    count: usize,
    delay_secs: f64,
    is_cancelled: F,
) -> Result<BenchmarkResult, SiriError>
where
    F: Fn() -> bool,
{
    let samples = run(client, request, count, delay_secs, is_cancelled);
    pin_mut!(samples);

    let mut result = BenchmarkResult::new(count);
    while let Some(sample) = samples.next().await {
        result.record(&sample?);
    }
    Ok(result)
}

/// Latencies of a benchmark run, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkResult {
    requested: usize,
    latencies_ms: Vec<f64>,
    failed: Vec<bool>,
}

impl BenchmarkResult {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            latencies_ms: Vec::with_capacity(requested),
            failed: Vec::with_capacity(requested),
        }
    }

    pub fn record(&mut self, sample: &Sample) {
        self.latencies_ms.push(sample.latency_ms);
        self.failed.push(sample.failure().is_some());
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Every recorded latency, failures included as `0.0`.
    pub fn latencies(&self) -> &[f64] {
        &self.latencies_ms
    }

    pub fn len(&self) -> usize {
        self.latencies_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latencies_ms.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.failed.iter().filter(|&&f| f).count()
    }

    /// True if the run stopped before `requested` samples were taken.
    pub fn was_cancelled(&self) -> bool {
        self.len() < self.requested
    }

    /// Statistics over successful samples; `None` if every request failed.
    pub fn summary(&self) -> Option<LatencySummary> {
        let ok: Vec<f64> = self
            .latencies_ms
            .iter()
            .zip(&self.failed)
            .filter(|(_, failed)| !**failed)
            .map(|(ms, _)| *ms)
            .collect();
        LatencySummary::from_latencies(&ok)
    }

    pub fn mean(&self) -> f64 {
        self.summary().map_or(0.0, |s| s.mean_ms)
    }

    pub fn stddev(&self) -> f64 {
        self.summary().map_or(0.0, |s| s.stddev_ms)
    }

    pub fn min(&self) -> Option<f64> {
        self.summary().map(|s| s.min_ms)
    }

    pub fn max(&self) -> Option<f64> {
        self.summary().map(|s| s.max_ms)
    }
}
