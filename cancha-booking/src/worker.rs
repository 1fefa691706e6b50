use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::sweeper::ExpirySweeper;

/// Purge expired holds every `interval` until `shutdown` resolves.
pub async fn run_sweeper<F>(sweeper: ExpirySweeper, interval: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("Hold sweeper started, running every {:?}", interval);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Hold sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                sweeper.purge().await;
            }
        }
    }
}
