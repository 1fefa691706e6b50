use std::sync::Arc;

use cancha_core::ReservationStore;
use chrono::Utc;
use tracing::{debug, error, info};

/// Removes temporary holds whose expiry has passed.
///
/// Runs before every booking attempt and on the background interval.
/// A failed sweep never fails the caller: stale holds only cause a
/// spurious `TemporarilyBlocked`, and the live-hold count filters by
/// expiry anyway.
pub struct ExpirySweeper {
    store: Arc<dyn ReservationStore>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Delete expired holds, returning how many went away (0 on failure).
    pub async fn purge(&self) -> u64 {
        match self.store.purge_expired_holds(Utc::now()).await {
            Ok(0) => {
                debug!("No expired holds to purge");
                0
            }
            Ok(removed) => {
                info!(removed, "Purged expired holds");
                removed
            }
            Err(e) => {
                error!("Failed to purge expired holds: {}", e);
                0
            }
        }
    }
}
