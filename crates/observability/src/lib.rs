//! # Observability
//!
//! Tracing + Prometheus wiring for the sync engine.
//!
//! The engine crates emit their own `metrics` counters and histograms
//! inline; this crate initializes the subscriber and the exporter, records
//! per-cycle gauges, and aggregates cycle reports in memory for the CLI
//! summary.
//!
//! ```ignore
//! observability::init()?;
//!
//! let report = orchestrator.sync_all_devices().await;
//! observability::record_cycle(&report);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{record_cycle, CycleAggregator, CycleSummary, RunningStats};

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Prometheus listener port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Default log level when RUST_LOG is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9300),
            default_log_level: "info".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Initialize tracing and Prometheus with defaults.
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Initialize with custom configuration.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    }
    .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Initialize only the Prometheus exporter.
///
/// For binaries that wire up tracing themselves.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, Some(9300));
        assert_eq!(config.default_log_level, "info");
    }
}
