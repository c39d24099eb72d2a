//! Structured logging and tracing for the exporter
//!
//! Console-only logging on top of the tracing ecosystem, initialized once at
//! startup from [`LoggingConfig`], plus a small per-component logger wrapper.

use crate::config::LoggingConfig;
use crate::error::{ExporterError, Result};
use std::sync::Once;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT_ONCE: Once = Once::new();

/// Initialize the logging system based on configuration
///
/// Repeated calls are no-ops so tests can initialize freely.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;

    INIT_ONCE.call_once(|| {
        let filter = build_env_filter(level);

        let console_layer = {
            let layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false);
            if config.json_format {
                layer
                    .json()
                    .with_filter(LevelFilter::from_level(level))
                    .boxed()
            } else {
                layer.with_filter(LevelFilter::from_level(level)).boxed()
            }
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .init();

        info!("Logging initialized - level: {:?}", level);
    });

    Ok(())
}

/// Parse a log level string into a tracing level
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(ExporterError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("myheat_exporter={},hyper=warn", level).into())
}

/// Component-scoped logger
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    /// Log an info message with component context
    pub fn info(&self, message: &str) {
        info!(component = %self.component, "{}", message);
    }
    /// Log a warning message with component context
    pub fn warn(&self, message: &str) {
        warn!(component = %self.component, "{}", message);
    }
    /// Log an error message with component context
    pub fn error(&self, message: &str) {
        error!(component = %self.component, "{}", message);
    }
    /// Log a debug message with component context
    pub fn debug(&self, message: &str) {
        debug!(component = %self.component, "{}", message);
    }
    /// Log a trace message with component context
    pub fn trace(&self, message: &str) {
        trace!(component = %self.component, "{}", message);
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger {
        component: component.to_string(),
    }
}
