//! Feeder daemon.
//!
//! Environment variables (a `.env` file is honoured):
//! - FEEDER_DATABASE__HOST, FEEDER_DATABASE__PORT, FEEDER_DATABASE__NAME
//! - FEEDER_DATABASE__USERNAME, FEEDER_DATABASE__PASSWORD
//! - FEEDER_BATCH_SIZE: rows per tick (default: 2)
//! - FEEDER_CUSTOMER_INTERVAL / FEEDER_ORDER_INTERVAL: e.g. `10s` (defaults: 10s / 15s)

use std::sync::Arc;

use anyhow::{Context, Result};
use cdc_feeder::db::postgres::PgConnector;
use cdc_feeder::shutdown::{create_shutdown_channel, SignalListener};
use cdc_feeder::telemetry::init_tracing;
use cdc_feeder::{FeederConfig, InsertJob, Inserter, RecordKind, Scheduler};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Arc::new(FeederConfig::load().context("failed to load feeder configuration")?);
    info!(
        batch_size = config.batch_size,
        customer_interval_secs = config.customer_interval.as_secs_f64(),
        order_interval_secs = config.order_interval.as_secs_f64(),
        "starting feeder"
    );

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let signals = SignalListener::install().context("failed to install signal handlers")?;
    tokio::spawn(signals.forward_to(shutdown_tx.clone()));

    let connector = PgConnector::new(&config.database);
    let inserter = Arc::new(
        Inserter::new(connector, Arc::clone(&config)).with_shutdown(shutdown_tx.subscribe()),
    );
    if let Err(err) = inserter.connect().await {
        // The first tick connects again, so a database still starting up is not fatal.
        warn!(%err, "initial connection failed");
    }

    Scheduler::new()
        .add_job(
            config.customer_interval,
            Arc::new(InsertJob::new(Arc::clone(&inserter), RecordKind::Customers)),
        )
        .add_job(
            config.order_interval,
            Arc::new(InsertJob::new(inserter, RecordKind::Orders)),
        )
        .run(shutdown_rx)
        .await;

    Ok(())
}
