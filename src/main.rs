use std::time::Instant;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cold_room_monitor::{
    clock::{CommandTimeSource, SystemTimeSource, TimeSource},
    config::{Config, TimeSourceKind},
    monitor::Monitor,
    sensors::{AdcThermometer, GpioDoor},
    temboo::{DynamoDbStore, TembooClient, TwilioSms},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the service environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(
        max_temp_c = config.thresholds.max_temp_c,
        min_temp_c = config.thresholds.min_temp_c,
        open_too_long_secs = config.thresholds.open_too_long.as_secs(),
        log_interval_secs = config.thresholds.log_interval.as_secs(),
        "Configuration loaded"
    );

    match config.time.source {
        TimeSourceKind::Command => {
            let clock = CommandTimeSource::new(&config.time.command, config.time.retry)?;
            run(&config, clock).await
        }
        TimeSourceKind::System => run(&config, SystemTimeSource).await,
    }
}

async fn run(config: &Config, clock: impl TimeSource) -> Result<()> {
    let temboo = TembooClient::new(config)?;

    let monitor = Monitor::new(
        &config.thresholds,
        Instant::now(),
        GpioDoor::new(config.sensors.door_pin, config.sensors.door_active_low),
        AdcThermometer::new(&config.sensors),
        clock,
        TwilioSms::new(temboo.clone(), config),
        DynamoDbStore::new(temboo, config),
    )
    .context("Failed to read initial door state")?;

    monitor.run(config.tick_interval, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
