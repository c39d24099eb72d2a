//! Metric sink over an explicit Prometheus registry
//!
//! Owns every time series the exporter publishes. The registry is a plain
//! struct threaded through the process rather than a process-global, so tests
//! get isolated registries and the exposition handler borrows the same
//! instance the poll cycle writes to.

use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::tariff::TariffId;
use prometheus::{GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

const METRIC_ENV_TEMP_CURRENT: &str = "myheat_env_temp_current";
const METRIC_ENV_TEMP_TARGET: &str = "myheat_env_temp_target";
const METRIC_ENV_HEAT_DEMAND: &str = "myheat_env_heat_demand";
const METRIC_ENV_DEMAND_SECONDS: &str = "myheat_env_heat_demand_seconds_total";
const METRIC_ENV_TARIFF_SECONDS: &str = "myheat_env_heat_tariff_seconds_total";
const METRIC_DEV_WEATHER_TEMP: &str = "myheat_dev_weather_temp";
const METRIC_DEV_SEVERITY: &str = "myheat_dev_severity";

/// Write-only facade over the exporter's time series
pub struct MetricSink {
    registry: Registry,
    logger: StructuredLogger,

    env_temp_current: GaugeVec,
    env_temp_target: GaugeVec,
    env_heat_demand: GaugeVec,
    pub(crate) env_demand_seconds: IntCounterVec,
    pub(crate) env_tariff_seconds: IntCounterVec,

    dev_weather_temp: GaugeVec,
    dev_severity: GaugeVec,
}

impl MetricSink {
    /// Create a sink with a fresh registry and all series vecs registered
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let env_temp_current = GaugeVec::new(
            Opts::new(METRIC_ENV_TEMP_CURRENT, "Current environment temperature"),
            &["id", "name"],
        )?;
        let env_temp_target = GaugeVec::new(
            Opts::new(METRIC_ENV_TEMP_TARGET, "Target environment temperature"),
            &["id", "name"],
        )?;
        let env_heat_demand = GaugeVec::new(
            Opts::new(
                METRIC_ENV_HEAT_DEMAND,
                "Whether heating is requested to reach the target temperature",
            ),
            &["id", "name"],
        )?;
        let env_demand_seconds = IntCounterVec::new(
            Opts::new(
                METRIC_ENV_DEMAND_SECONDS,
                "Cumulative seconds during which heating was requested",
            ),
            &["id", "name"],
        )?;
        let env_tariff_seconds = IntCounterVec::new(
            Opts::new(
                METRIC_ENV_TARIFF_SECONDS,
                "Cumulative heating seconds split by billing tariff",
            ),
            &["id", "tariff"],
        )?;
        let dev_weather_temp = GaugeVec::new(
            Opts::new(METRIC_DEV_WEATHER_TEMP, "Outdoor temperature at the device"),
            &["id", "name", "city"],
        )?;
        let dev_severity = GaugeVec::new(
            Opts::new(METRIC_DEV_SEVERITY, "Device severity state"),
            &["id", "name"],
        )?;

        registry.register(Box::new(env_temp_current.clone()))?;
        registry.register(Box::new(env_temp_target.clone()))?;
        registry.register(Box::new(env_heat_demand.clone()))?;
        registry.register(Box::new(env_demand_seconds.clone()))?;
        registry.register(Box::new(env_tariff_seconds.clone()))?;
        registry.register(Box::new(dev_weather_temp.clone()))?;
        registry.register(Box::new(dev_severity.clone()))?;

        Ok(Self {
            registry,
            logger: get_logger("metrics"),
            env_temp_current,
            env_temp_target,
            env_heat_demand,
            env_demand_seconds,
            env_tariff_seconds,
            dev_weather_temp,
            dev_severity,
        })
    }

    /// Set the current temperature gauge for an environment
    pub fn set_env_temp_current(&self, id: i64, name: &str, value: f64) {
        self.logger.debug(&format!(
            "set {} id={} name={} value={}",
            METRIC_ENV_TEMP_CURRENT, id, name, value
        ));
        self.env_temp_current
            .with_label_values(&[&id.to_string(), name])
            .set(value);
    }

    /// Set the target temperature gauge for an environment
    pub fn set_env_temp_target(&self, id: i64, name: &str, value: f64) {
        self.logger.debug(&format!(
            "set {} id={} name={} value={}",
            METRIC_ENV_TEMP_TARGET, id, name, value
        ));
        self.env_temp_target
            .with_label_values(&[&id.to_string(), name])
            .set(value);
    }

    /// Set the 0/1 heat demand gauge for an environment
    pub fn set_env_heat_demand(&self, id: i64, name: &str, demand: bool) {
        self.logger.debug(&format!(
            "set {} id={} name={} value={}",
            METRIC_ENV_HEAT_DEMAND, id, name, demand
        ));
        self.env_heat_demand
            .with_label_values(&[&id.to_string(), name])
            .set(if demand { 1.0 } else { 0.0 });
    }

    /// Add one second to an environment's demand-seconds counter
    pub fn inc_env_demand_seconds(&self, id: i64, name: &str) {
        self.env_demand_seconds
            .with_label_values(&[&id.to_string(), name])
            .inc();
    }

    /// Add one second to an environment's per-tariff counter
    pub fn inc_env_tariff_seconds(&self, id: i64, tariff: TariffId) {
        self.env_tariff_seconds
            .with_label_values(&[&id.to_string(), &tariff.to_string()])
            .inc();
    }

    /// Set the outdoor temperature gauge for a device
    pub fn set_device_weather_temp(&self, id: i64, name: &str, city: &str, value: f64) {
        self.logger.debug(&format!(
            "set {} id={} name={} city={} value={}",
            METRIC_DEV_WEATHER_TEMP, id, name, city, value
        ));
        self.dev_weather_temp
            .with_label_values(&[&id.to_string(), name, city])
            .set(value);
    }

    /// Set the severity gauge for a device
    ///
    /// Only one severity value is meaningful per device at a time, so all
    /// prior severity series are cleared before the new value lands.
    pub fn set_device_severity(&self, id: i64, name: &str, value: i64, desc: &str) {
        self.logger.debug(&format!(
            "set {} id={} name={} value={} desc={}",
            METRIC_DEV_SEVERITY, id, name, value, desc
        ));
        self.dev_severity.reset();
        self.dev_severity
            .with_label_values(&[&id.to_string(), name])
            .set(value as f64);
    }

    /// Render all series in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = String::new();
        TextEncoder::new().encode_utf8(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
