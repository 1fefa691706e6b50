use std::sync::Arc;
use std::time::Duration;

use cancha_booking::{run_sweeper, ExpirySweeper};
use cancha_store::app_config::Config;
use cancha_store::{DbClient, PgReservationStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cancha_booking=debug,cancha_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting hold sweeper");

    let db = DbClient::new(&config.database).await?;
    let store = Arc::new(PgReservationStore::new(db.pool.clone()));
    let sweeper = ExpirySweeper::new(store);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    };

    run_sweeper(
        sweeper,
        Duration::from_secs(config.sweeper.interval_seconds.max(1)),
        shutdown,
    )
    .await;

    db.pool.close().await;
    Ok(())
}
