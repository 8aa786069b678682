//! CLI entry point for the SIRI REST client.
//!
//! Provides subcommands that benchmark vehicle-monitoring and stop-monitoring
//! requests against a SIRI server and report per-request latency.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::{StreamExt, pin_mut};
use siri_rest_client::{
    benchmark::{self, BenchmarkResult, CancelHandle, MonitoringRequest},
    client::{RequestOutcome, SiriClient},
    config::Settings,
    output::{append_record, print_json, print_pretty, print_summary},
    parser::ResponseDecoder,
    query::{ABSENT, StopMonitoringQuery, VehicleMonitoringQuery},
    stats::DeliveryStats,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEV_KEY_ENV: &str = "SIRI_DEV_KEY";

#[derive(Parser)]
#[command(name = "siri_rest_client")]
#[command(about = "A client to query and benchmark SIRI REST servers", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: SharedOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SharedOptions {
    /// JSON settings file (base URLs, timeout, request config, benchmark parameters)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Response format: json or xml
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Connection strategy: embedded or explicit
    #[arg(short, long, global = true)]
    transport: Option<String>,

    /// JSON decoder strategy: single-shot or reusable
    #[arg(short, long, global = true)]
    decoder: Option<String>,

    /// Number of sequential requests
    #[arg(short = 'n', long, global = true)]
    requests: Option<usize>,

    /// Seconds to wait between requests (fractions allowed)
    #[arg(long, global = true)]
    delay: Option<f64>,

    /// Developer key sent as the `key` parameter
    #[arg(short, long, global = true)]
    key: Option<String>,

    /// File holding the developer key, used when no key is given otherwise
    #[arg(long, global = true)]
    key_file: Option<String>,

    /// CSV file to append one row per request to
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Log each response summary as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Request real-time vehicle positions
    VehicleMonitoring {
        #[command(flatten)]
        common: QueryArgs,

        /// Restrict to a single vehicle
        #[arg(long, default_value = "")]
        vehicle_ref: String,
    },
    /// Request real-time arrivals at a stop
    StopMonitoring {
        #[command(flatten)]
        common: QueryArgs,

        /// Stop identifier
        #[arg(long)]
        monitoring_ref: String,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Operator (agency) identifier, e.g. "MTA"
    #[arg(long)]
    operator_ref: String,

    #[arg(long, default_value = "")]
    line_ref: String,

    /// 0 or 1
    #[arg(long)]
    direction_ref: Option<String>,

    /// normal or calls
    #[arg(long, default_value = "")]
    detail_level: String,

    #[arg(long)]
    max_calls_onwards: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/siri_rest_client.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("siri_rest_client.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.options)?;
    let dev_key = resolve_dev_key(cli.options.key.clone(), cli.options.key_file.as_deref())?;

    let request = match cli.command {
        Commands::VehicleMonitoring {
            common,
            vehicle_ref,
        } => MonitoringRequest::Vehicle(VehicleMonitoringQuery {
            dev_key,
            operator_ref: common.operator_ref,
            vehicle_ref,
            line_ref: common.line_ref,
            direction_ref: parse_numeric("direction-ref", common.direction_ref.as_deref()),
            detail_level: common.detail_level,
            max_calls_onwards: parse_numeric(
                "max-calls-onwards",
                common.max_calls_onwards.as_deref(),
            ),
        }),
        Commands::StopMonitoring {
            common,
            monitoring_ref,
        } => MonitoringRequest::Stop(StopMonitoringQuery {
            dev_key,
            operator_ref: common.operator_ref,
            monitoring_ref,
            line_ref: common.line_ref,
            direction_ref: parse_numeric("direction-ref", common.direction_ref.as_deref()),
            detail_level: common.detail_level,
            max_calls_onwards: parse_numeric(
                "max-calls-onwards",
                common.max_calls_onwards.as_deref(),
            ),
        }),
    };

    let decoder = Arc::new(ResponseDecoder::new());
    let mut client = SiriClient::from_settings(&settings, decoder)?;

    let cancel = CancelHandle::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, stopping after the current request");
                cancel.cancel();
            }
        });
    }

    let result = run_benchmark(
        &mut client,
        &request,
        &settings,
        cli.options.output.as_deref(),
        cli.options.json,
        &cancel,
    )
    .await?;
    print_summary(&result);

    Ok(())
}

/// Runs the benchmark, logging and persisting a row per request.
#[tracing::instrument(skip_all, fields(kind = request.kind(), requests = settings.num_requests))]
async fn run_benchmark(
    client: &mut SiriClient,
    request: &MonitoringRequest,
    settings: &Settings,
    output: Option<&str>,
    json: bool,
    cancel: &CancelHandle,
) -> Result<BenchmarkResult> {
    let config = client.config();
    let samples = benchmark::run(
        client,
        request,
        settings.num_requests,
        settings.time_between_requests,
        || cancel.is_cancelled(),
    );
    pin_mut!(samples);

    let mut result = BenchmarkResult::new(settings.num_requests);
    while let Some(sample) = samples.next().await {
        let sample = sample?;
        result.record(&sample);

        let stats = match &sample.outcome {
            RequestOutcome::Received(siri) => {
                info!(
                    sample = sample.index,
                    latency_ms = sample.latency_ms,
                    "Response received"
                );
                DeliveryStats::from_siri(siri)
            }
            RequestOutcome::Unreachable(e) => {
                warn!(sample = sample.index, error = %e, "Server unreachable");
                DeliveryStats::from_error("transport_error", &e.to_string())
            }
        }
        .with_request_info(request.kind(), config, sample.index)
        .with_latency(sample.latency_ms);

        if json {
            print_json(&stats)?;
        } else {
            print_pretty(&stats);
        }

        if let Some(path) = output {
            append_record(path, &stats)
                .with_context(|| format!("Failed to write results to {path}"))?;
        }
    }

    Ok(result)
}

/// Settings file (if any) with command-line overrides applied.
fn load_settings(options: &SharedOptions) -> Result<Settings> {
    let mut settings = match &options.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(format) = &options.format {
        settings.request.response_format = format.parse()?;
    }
    if let Some(transport) = &options.transport {
        settings.request.transport = transport.parse()?;
    }
    if let Some(decoder) = &options.decoder {
        settings.request.decoder_mode = decoder.parse()?;
    }
    if let Some(requests) = options.requests {
        settings.num_requests = requests;
    }
    if let Some(delay) = options.delay {
        settings.time_between_requests = delay;
    }

    settings.validate()?;
    debug!(?settings, "Settings loaded");
    Ok(settings)
}

/// Developer key from the command line, the environment, or a key file.
fn resolve_dev_key(key: Option<String>, key_file: Option<&str>) -> Result<String> {
    if let Some(key) = key {
        return Ok(key);
    }
    if let Ok(key) = std::env::var(DEV_KEY_ENV) {
        return Ok(key);
    }
    if let Some(path) = key_file {
        let key = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {path}"))?;
        return Ok(key.trim().to_string());
    }

    warn!("No developer key given, sending requests without one");
    Ok(String::new())
}

/// Parses an optional integer field, falling back to the absent sentinel.
fn parse_numeric(field: &str, value: Option<&str>) -> i32 {
    match value.map(str::trim) {
        None | Some("") => ABSENT,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(field, value = raw, "Not a number, ignoring");
            ABSENT
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_fallback() {
        assert_eq!(parse_numeric("direction-ref", Some("1")), 1);
        assert_eq!(parse_numeric("direction-ref", Some(" 0 ")), 0);
        assert_eq!(parse_numeric("direction-ref", Some("north")), ABSENT);
        assert_eq!(parse_numeric("direction-ref", None), ABSENT);
        assert_eq!(parse_numeric("max-calls-onwards", Some("")), ABSENT);
    }

    #[test]
    fn test_key_from_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, "  abc123\n").unwrap();

        let key = resolve_dev_key(Some("cli".to_string()), path.to_str()).unwrap();
        assert_eq!(key, "cli");

        if std::env::var(DEV_KEY_ENV).is_err() {
            let key = resolve_dev_key(None, path.to_str()).unwrap();
            assert_eq!(key, "abc123");
        }
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "siri_rest_client",
            "--format",
            "xml",
            "--transport",
            "explicit",
            "-n",
            "5",
            "stop-monitoring",
            "--operator-ref",
            "MTA",
            "--monitoring-ref",
            "308214",
        ]);
        let settings = load_settings(&cli.options).unwrap();

        assert_eq!(settings.num_requests, 5);
        assert_eq!(
            settings.request.response_format,
            siri_rest_client::config::ResponseFormat::Xml
        );
        assert!(matches!(cli.command, Commands::StopMonitoring { .. }));
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        let cli = Cli::parse_from([
            "siri_rest_client",
            "vehicle-monitoring",
            "--operator-ref",
            "MTA",
            "--transport",
            "carrier-pigeon",
        ]);
        assert!(load_settings(&cli.options).is_err());
    }
}
