//! Observability - tracing setup and per-engine execution counters

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use crate::sql::types::QueryResult;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global `tracing` subscriber for the configured level and format.
///
/// `RUST_LOG` takes precedence over `config.level` when set. Calling this
/// again after a subscriber is installed is a no-op.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Config(format!("Invalid log filter {}: {}", config.level, e)))?;

    let installed = match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        "pretty" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init(),
        other => return Err(Error::Config(format!("Invalid log format: {}", other))),
    };

    if installed.is_err() {
        debug!("Tracing subscriber already installed");
    }
    Ok(())
}

/// Counters for statements run through one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub statements: u64,
    pub failed: u64,
    pub rows_returned: u64,
    pub rows_inserted: u64,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, result: &QueryResult) {
        self.statements += 1;
        self.rows_returned += result.rows.len() as u64;
        self.rows_inserted += result.rows_affected;
    }

    pub fn record_failure(&mut self) {
        self.statements += 1;
        self.failed += 1;
    }

    /// Fraction of statements that failed, 0.0 before any were run.
    pub fn failure_rate(&self) -> f64 {
        if self.statements == 0 {
            0.0
        } else {
            self.failed as f64 / self.statements as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "statements": self.statements,
            "failed": self.failed,
            "rows_returned": self.rows_returned,
            "rows_inserted": self.rows_inserted,
            "failure_rate": self.failure_rate(),
        })
    }
}
