//! Output formatting and persistence for benchmark results.
//!
//! Per-request rows are logged or appended to CSV; the run as a whole is
//! logged as a latency summary.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::benchmark::BenchmarkResult;
use crate::stats::DeliveryStats;
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Logs the headline numbers of one request; the full record goes to trace.
pub fn print_pretty(stats: &DeliveryStats) {
    let kind = stats.request_kind.as_deref();
    match &stats.error_type {
        Some(error_type) => debug!(
            kind,
            sample = stats.sample,
            error_type = error_type.as_str(),
            error = stats.error_message.as_deref(),
            "Request failed"
        ),
        None => debug!(
            kind,
            sample = stats.sample,
            latency_ms = stats.latency_ms,
            journeys = stats.journeys,
            location_pct = stats.location_pct(),
            bearing_pct = stats.bearing_pct(),
            situations = stats.situations,
            "Delivery received"
        ),
    }
    trace!("{:#?}", stats);
}

/// Logs one request's record as pretty-printed JSON, tagged with its kind
/// and sample index.
pub fn print_json(stats: &DeliveryStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    info!(
        kind = stats.request_kind.as_deref(),
        sample = stats.sample,
        "{json}"
    );
    Ok(())
}

/// Logs the latency summary of a benchmark run.
pub fn print_summary(result: &BenchmarkResult) {
    if result.is_empty() {
        warn!(requested = result.requested(), "No samples were taken");
        return;
    }

    let Some(latency) = result.summary() else {
        warn!(
            samples = result.len(),
            failures = result.failures(),
            "Every request failed, no latency to report"
        );
        return;
    };

    info!(
        samples = result.len(),
        requested = result.requested(),
        failures = result.failures(),
        cancelled = result.was_cancelled(),
        mean_ms = latency.mean_ms,
        stddev_ms = latency.stddev_ms,
        min_ms = latency.min_ms,
        max_ms = latency.max_ms,
        "Benchmark summary"
    );
}

/// Appends one record as a CSV row, writing the header only when the file
/// is new. Missing parent directories are created.
///
/// For [`DeliveryStats`] a row carries `latency_ms` (`0.0` for a failed
/// request) next to the delivery counts, so rows from one run can be
/// aggregated without the log.
pub fn append_record<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}
