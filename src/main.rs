use anyhow::Result;
use myheat_exporter::config::Config;
use myheat_exporter::demand::DemandAccumulator;
use myheat_exporter::exporter::Exporter;
use myheat_exporter::metrics::MetricSink;
use myheat_exporter::myheat::MyHeatClient;
use myheat_exporter::tariff::{TariffSelector, TariffWindow};
use myheat_exporter::{logging, web};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!("MyHeat exporter {} starting up", env!("APP_VERSION"));

    let sink = Arc::new(
        MetricSink::new().map_err(|e| anyhow::anyhow!("failed to create metric sink: {}", e))?,
    );

    let mut windows = Vec::new();
    if let Some(night) = &config.night_tariff {
        windows.push(TariffWindow::night(night.from, night.to));
        info!(from = night.from, to = night.to, "night tariff applied");
    }
    let selector = TariffSelector::system(windows);

    let accumulator = Arc::new(DemandAccumulator::new(selector, Arc::clone(&sink)));

    let client = MyHeatClient::new(config.myheat.clone())
        .map_err(|e| anyhow::anyhow!("failed to create MyHeat client: {}", e))?;
    let exporter = Exporter::new(
        config.pull_interval,
        client,
        Arc::clone(&sink),
        Arc::clone(&accumulator),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let accumulator_task = tokio::spawn({
        let accumulator = Arc::clone(&accumulator);
        let shutdown = shutdown_rx.clone();
        async move { accumulator.run(shutdown).await }
    });

    let exporter_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { exporter.run(shutdown).await }
    });

    let web_task = tokio::spawn({
        let sink = Arc::clone(&sink);
        let listen_addr = config.listen_addr.clone();
        let shutdown = shutdown_rx.clone();
        async move {
            if let Err(e) = web::serve(&listen_addr, sink, shutdown).await {
                error!("web server error: {}", e);
            }
        }
    });

    wait_for_signal().await?;
    info!("shutdown signal received");

    let _ = shutdown_tx.send(true);

    let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = accumulator_task.await;
        let _ = exporter_task.await;
        let _ = web_task.await;
    })
    .await;
    if joined.is_err() {
        warn!("grace period elapsed before all tasks stopped");
    }

    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
