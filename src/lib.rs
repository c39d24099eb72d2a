//! # MyHeat Prometheus exporter
//!
//! Polls the MyHeat cloud API for heating controllers and republishes their
//! state as Prometheus time series: room temperatures, heat demand, outdoor
//! temperature, device severity and cumulative heat-demand seconds split by
//! billing tariff.
//!
//! ## Architecture
//!
//! - `config`: environment-driven configuration and validation
//! - `logging`: structured logging and tracing
//! - `tariff`: time-of-day billing tariff selection
//! - `demand`: per-environment demand state and the one-second accumulator
//! - `metrics`: Prometheus registry ownership and typed setters
//! - `myheat`: vendor API client
//! - `exporter`: the periodic poll cycle
//! - `web`: HTTP exposition endpoint

pub mod config;
pub mod demand;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod metrics;
pub mod myheat;
pub mod tariff;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use demand::DemandAccumulator;
pub use error::{ExporterError, Result};
pub use exporter::Exporter;
pub use metrics::MetricSink;
pub use tariff::{TariffSelector, TariffWindow};
