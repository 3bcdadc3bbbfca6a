//! `watt-station`: EV charging station dispatch server.
//!
//! Reads configuration from a TOML file (`$WATT_STATION_CONFIG`, or the
//! platform config directory), falling back to compiled-in defaults if
//! the file is missing or malformed.

use std::sync::Arc;

use tracing::{error, info};

use watt_station::config::{default_config_path, AppConfig};
use watt_station::domain::{Bill, ChargingPile, ChargingRequest, ChargingSession, User};
use watt_station::server::StationServer;
use watt_station::store::JsonFileStore;
use watt_station::support::{ShutdownSignal, SystemClock};
use watt_station::{ChargingStation, StoreSet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = default_config_path();

    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg.logging.level);
            info!(path = %config_path.display(), "configuration loaded");
            cfg
        }
        Err(e) => {
            init_tracing("info");
            error!(%e, "failed to load config, using defaults");
            AppConfig::default()
        }
    };

    info!("starting watt-station charging dispatch server");

    let stores = open_stores(&app_cfg)?;
    let clock = Arc::new(SystemClock);
    let station = ChargingStation::build(&app_cfg.station, clock, stores).await;

    let shutdown = ShutdownSignal::new();
    shutdown.start_signal_listener();

    let server = StationServer::new(station.router.clone());
    let server_addr = app_cfg.address();

    let scheduler = station.scheduler.clone();
    let scheduler_shutdown = shutdown.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    let server_shutdown = shutdown.clone();
    let server_result = server.run(&server_addr, server_shutdown).await;

    shutdown.trigger();
    if let Err(e) = scheduler_task.await {
        error!(%e, "scheduler task panicked");
    }

    info!("watt-station shut down cleanly");
    server_result.map_err(Into::into)
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

/// Opens the five `JsonFileStore`s under `storage.data_dir`, one file
/// per entity kind (§6 "Persisted state").
fn open_stores(cfg: &AppConfig) -> std::io::Result<StoreSet> {
    let dir = &cfg.storage.data_dir;
    std::fs::create_dir_all(dir)?;

    Ok(StoreSet {
        users: Arc::new(JsonFileStore::<User>::open(dir.join("users.json"))?),
        piles: Arc::new(JsonFileStore::<ChargingPile>::open(dir.join("piles.json"))?),
        sessions: Arc::new(JsonFileStore::<ChargingSession>::open(dir.join("sessions.json"))?),
        bills: Arc::new(JsonFileStore::<Bill>::open(dir.join("bills.json"))?),
        requests: Arc::new(JsonFileStore::<ChargingRequest>::open(dir.join("requests.json"))?),
    })
}
