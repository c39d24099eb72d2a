//! Configuration management for the exporter
//!
//! All configuration comes from environment variables, mirroring how the
//! service is deployed (container env). Required settings fail startup with a
//! configuration error; optional settings fall back to defaults.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default MyHeat API endpoint
pub const DEFAULT_ENDPOINT_URL: &str = "https://my.myheat.net/api/request/";

/// Default listen address for the metrics endpoint
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Vendor API connection settings
    pub myheat: MyHeatConfig,

    /// Interval between poll cycles
    pub pull_interval: Duration,

    /// Optional secondary (night) tariff window
    pub night_tariff: Option<NightTariffConfig>,

    /// Bind address for the metrics HTTP endpoint
    pub listen_addr: String,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// MyHeat API credentials and endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyHeatConfig {
    /// API endpoint URL
    pub endpoint_url: String,

    /// Account login
    pub login: String,

    /// Account API key
    pub key: String,
}

impl Default for MyHeatConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            login: String::new(),
            key: String::new(),
        }
    }
}

impl MyHeatConfig {
    /// Validate credentials are present
    pub fn validate(&self) -> Result<()> {
        if self.login.is_empty() {
            return Err(ExporterError::validation(
                "MYHEAT_LOGIN",
                "login cannot be empty",
            ));
        }
        if self.key.is_empty() {
            return Err(ExporterError::validation(
                "MYHEAT_KEY",
                "key cannot be empty",
            ));
        }
        if self.endpoint_url.is_empty() {
            return Err(ExporterError::validation(
                "MYHEAT_ENDPOINT_URL",
                "endpoint URL cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Night tariff window bounds in local wall-clock hours
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NightTariffConfig {
    /// Start hour, inclusive (0-23)
    pub from: u32,

    /// End hour, exclusive (0-23); may be below `from` for windows that wrap
    /// midnight
    pub to: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Emit JSON-formatted log lines
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load and validate configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load and validate configuration from an arbitrary variable lookup
    ///
    /// The lookup seam keeps configuration tests independent of process-wide
    /// environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let myheat = MyHeatConfig {
            endpoint_url: lookup("MYHEAT_ENDPOINT_URL")
                .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string()),
            login: lookup("MYHEAT_LOGIN").unwrap_or_default(),
            key: lookup("MYHEAT_KEY").unwrap_or_default(),
        };

        let pull_interval = parse_pull_interval(lookup("MYHEAT_EXPORTER_PULL_INTERVAL"))?;

        let night_tariff = parse_night_tariff(
            lookup("MYHEAT_TARIFF2_FROM"),
            lookup("MYHEAT_TARIFF2_TO"),
        )?;

        let listen_addr =
            lookup("MYHEAT_EXPORTER_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let logging = LoggingConfig {
            level: lookup("MYHEAT_EXPORTER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_format: lookup("MYHEAT_EXPORTER_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        let config = Config {
            myheat,
            pull_interval,
            night_tariff,
            listen_addr,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.myheat.validate()?;

        if self.pull_interval.is_zero() {
            return Err(ExporterError::validation(
                "MYHEAT_EXPORTER_PULL_INTERVAL",
                "must be a positive duration",
            ));
        }

        if self.listen_addr.is_empty() {
            return Err(ExporterError::validation(
                "MYHEAT_EXPORTER_LISTEN_ADDR",
                "listen address cannot be empty",
            ));
        }

        Ok(())
    }
}

fn parse_pull_interval(raw: Option<String>) -> Result<Duration> {
    let raw = raw.ok_or_else(|| {
        ExporterError::config("MYHEAT_EXPORTER_PULL_INTERVAL is not set")
    })?;
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ExporterError::validation(
            "MYHEAT_EXPORTER_PULL_INTERVAL",
            "must be a whole number of seconds",
        )
    })?;
    if secs == 0 {
        return Err(ExporterError::validation(
            "MYHEAT_EXPORTER_PULL_INTERVAL",
            "must be a positive duration",
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_night_tariff(
    from: Option<String>,
    to: Option<String>,
) -> Result<Option<NightTariffConfig>> {
    match (from, to) {
        (Some(from), Some(to)) => Ok(Some(NightTariffConfig {
            from: parse_hour("MYHEAT_TARIFF2_FROM", &from)?,
            to: parse_hour("MYHEAT_TARIFF2_TO", &to)?,
        })),
        (None, None) => Ok(None),
        _ => Err(ExporterError::config(
            "MYHEAT_TARIFF2_FROM and MYHEAT_TARIFF2_TO must be supplied together",
        )),
    }
}

fn parse_hour(field: &str, raw: &str) -> Result<u32> {
    let hour: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ExporterError::validation(field, "must be an hour between 0 and 23"))?;
    if hour > 23 {
        return Err(ExporterError::validation(
            field,
            "must be an hour between 0 and 23",
        ));
    }
    Ok(hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_full_environment_parses() {
        let config = Config::from_lookup(vars(&[
            ("MYHEAT_LOGIN", "user"),
            ("MYHEAT_KEY", "secret"),
            ("MYHEAT_EXPORTER_PULL_INTERVAL", "30"),
            ("MYHEAT_TARIFF2_FROM", "23"),
            ("MYHEAT_TARIFF2_TO", "7"),
        ]))
        .unwrap();

        assert_eq!(config.myheat.login, "user");
        assert_eq!(config.myheat.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.pull_interval, Duration::from_secs(30));
        let night = config.night_tariff.unwrap();
        assert_eq!((night.from, night.to), (23, 7));
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_missing_credentials_fatal() {
        let err = Config::from_lookup(vars(&[("MYHEAT_EXPORTER_PULL_INTERVAL", "30")]))
            .unwrap_err();
        assert!(matches!(err, ExporterError::Validation { .. }));
    }

    #[test]
    fn test_pull_interval_must_be_positive() {
        let err = Config::from_lookup(vars(&[
            ("MYHEAT_LOGIN", "user"),
            ("MYHEAT_KEY", "secret"),
            ("MYHEAT_EXPORTER_PULL_INTERVAL", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ExporterError::Validation { .. }));
    }

    #[test]
    fn test_pull_interval_required() {
        let err = Config::from_lookup(vars(&[
            ("MYHEAT_LOGIN", "user"),
            ("MYHEAT_KEY", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ExporterError::Config { .. }));
    }

    #[test]
    fn test_lone_tariff_bound_rejected() {
        let err = Config::from_lookup(vars(&[
            ("MYHEAT_LOGIN", "user"),
            ("MYHEAT_KEY", "secret"),
            ("MYHEAT_EXPORTER_PULL_INTERVAL", "30"),
            ("MYHEAT_TARIFF2_FROM", "23"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ExporterError::Config { .. }));
    }

    #[test]
    fn test_out_of_range_hour_rejected() {
        let err = Config::from_lookup(vars(&[
            ("MYHEAT_LOGIN", "user"),
            ("MYHEAT_KEY", "secret"),
            ("MYHEAT_EXPORTER_PULL_INTERVAL", "30"),
            ("MYHEAT_TARIFF2_FROM", "24"),
            ("MYHEAT_TARIFF2_TO", "7"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ExporterError::Validation { .. }));
    }
}
