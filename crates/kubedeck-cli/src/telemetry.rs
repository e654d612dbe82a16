//! Tracing subscriber setup

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

use crate::error::{CliError, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output for terminals
    Pretty,
    /// One JSON object per line
    Json,
}

/// Install the global subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let result = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            Registry::default().with(filter).with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            ),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            Registry::default()
                .with(filter)
                .with(fmt::layer().with_ansi(true).with_target(true)),
        ),
    };

    result.map_err(|e| CliError::internal(format!("failed to initialize logging: {}", e)))
}
