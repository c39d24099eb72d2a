//! Polling/export cycle
//!
//! Pulls the device list on a fixed interval, fans out per-device detail
//! fetches and feeds the results into the metric sink and the demand
//! accumulator. One device failing never aborts the cycle for the rest; a
//! failed device-list fetch ends the cycle and the next tick retries.

use crate::demand::DemandAccumulator;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::metrics::MetricSink;
use crate::myheat::{ENV_TYPE_ROOM_TEMPERATURE, HeatSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// Periodic poll cycle over a heat source
pub struct Exporter<S: HeatSource> {
    pull_interval: Duration,
    client: S,
    sink: Arc<MetricSink>,
    accumulator: Arc<DemandAccumulator>,
    logger: StructuredLogger,
}

impl<S: HeatSource> Exporter<S> {
    /// Create an exporter; the interval must already be validated positive
    pub fn new(
        pull_interval: Duration,
        client: S,
        sink: Arc<MetricSink>,
        accumulator: Arc<DemandAccumulator>,
    ) -> Self {
        Self {
            pull_interval,
            client,
            sink,
            accumulator,
            logger: get_logger("exporter"),
        }
    }

    /// Access the underlying heat source
    pub fn client(&self) -> &S {
        &self.client
    }

    /// Run the poll loop until shutdown
    ///
    /// The first pull happens immediately; after that one pull per interval
    /// tick, never overlapping. An in-flight pull is raced against shutdown
    /// so cancellation drops the pending fetch instead of waiting it out.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        self.logger.info("exporter started");

        let mut ticker = interval(self.pull_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    self.logger.info("received shutdown signal, exiting");
                    return;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    self.logger.info("received shutdown signal mid-pull, exiting");
                    return;
                }
                result = self.pull() => {
                    if let Err(e) = result {
                        self.logger.error(&format!("error while pulling data: {}", e));
                    }
                }
            }
        }
    }

    /// Execute one full fetch-all-devices-and-update-metrics pass
    pub async fn pull(&self) -> Result<()> {
        let devices_response = self.client.get_devices().await?;
        let devices = devices_response.devices();

        if devices.is_empty() {
            self.logger.debug("no devices returned");
            return Ok(());
        }

        for device in devices {
            let info = match self.client.get_device_info(device.id).await {
                Ok(response) => response,
                Err(e) => {
                    self.logger
                        .error(&format!("get device info failed: id={} error={}", device.id, e));
                    continue;
                }
            };

            let data = info.data;
            if data.envs.is_empty() {
                self.logger
                    .info(&format!("empty device info data: id={}", device.id));
                continue;
            }

            self.sink
                .set_device_weather_temp(device.id, &device.name, &data.city, data.weather_temp);
            self.sink
                .set_device_severity(device.id, &device.name, data.severity, &data.severity_desc);

            for env in &data.envs {
                if env.env_type != ENV_TYPE_ROOM_TEMPERATURE {
                    continue;
                }

                self.sink.set_env_temp_current(env.id, &env.name, env.value);
                self.sink.set_env_temp_target(env.id, &env.name, env.target);
                self.sink.set_env_heat_demand(env.id, &env.name, env.demand);
                self.accumulator.record_sample(env.id, &env.name, env.demand);
            }
        }

        Ok(())
    }
}
