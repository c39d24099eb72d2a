//! Heat demand accumulation
//!
//! The vendor API only reports whether an environment is currently demanding
//! heat. To turn that boolean into "seconds of demand" counters the
//! accumulator samples its own record set once per second, far finer than the
//! poll cycle, so duration accounting stays smooth and tariff attribution
//! stays accurate near window boundaries.

use crate::logging::{StructuredLogger, get_logger};
use crate::metrics::MetricSink;
use crate::tariff::TariffSelector;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Latest known demand state for one environment
#[derive(Debug, Clone)]
struct DemandRecord {
    id: i64,
    name: String,
    active: bool,
}

/// Concurrent-safe store of per-environment demand state
///
/// Writers (`record_sample`, one call per environment per poll cycle) take
/// the exclusive lock; the ticking reader sweeps the whole map under the
/// shared lock, so a sweep sees each record either fully before or fully
/// after any concurrent update.
pub struct DemandAccumulator {
    records: RwLock<HashMap<i64, DemandRecord>>,
    selector: TariffSelector,
    sink: Arc<MetricSink>,
    logger: StructuredLogger,
}

impl DemandAccumulator {
    /// Create an accumulator feeding the given sink
    pub fn new(selector: TariffSelector, sink: Arc<MetricSink>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            selector,
            sink,
            logger: get_logger("demand"),
        }
    }

    /// Record the latest demand sample for an environment
    ///
    /// Creates the record on first sight, otherwise overwrites it in place.
    /// Only the current boolean is kept; between two ticks the last write
    /// wins.
    pub fn record_sample(&self, id: i64, name: &str, active: bool) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records
            .entry(id)
            .and_modify(|record| {
                record.name = name.to_string();
                record.active = active;
            })
            .or_insert_with(|| DemandRecord {
                id,
                name: name.to_string(),
                active,
            });
    }

    /// Convert one second of active demand into counter increments
    ///
    /// The tariff is resolved once and applied to every active record in the
    /// sweep, so a single tick never splits across two tariffs.
    pub fn tick(&self) {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let tariff = self.selector.select();

        for record in records.values() {
            if !record.active {
                continue;
            }

            self.sink.inc_env_demand_seconds(record.id, &record.name);
            self.sink.inc_env_tariff_seconds(record.id, tariff);
        }
    }

    /// Run the one-second tick loop until shutdown
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        self.logger.info("demand accumulator started");

        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    self.logger.info("received shutdown signal, exiting");
                    return;
                }
                _ = ticker.tick() => self.tick(),
            }
        }
    }
}
