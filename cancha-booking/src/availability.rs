use cancha_core::{Slot, SlotTransaction, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What currently obstructs a slot, as seen inside its locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupancy {
    pub reservations: i64,
    pub holds: i64,
}

impl SlotOccupancy {
    pub fn is_free(&self) -> bool {
        self.reservations == 0 && self.holds == 0
    }
}

/// Result of an advisory availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub existing_reservations: i64,
    pub active_holds: i64,
}

impl From<SlotOccupancy> for AvailabilityReport {
    fn from(occupancy: SlotOccupancy) -> Self {
        Self {
            available: occupancy.is_free(),
            existing_reservations: occupancy.reservations,
            active_holds: occupancy.holds,
        }
    }
}

/// Take every advisory lock guarding `slot`, in key order.
pub async fn lock_slot(tx: &mut dyn SlotTransaction, slot: &Slot, granularity_minutes: u32) -> StoreResult<()> {
    let keys = slot.lock_keys(granularity_minutes);
    for key in &keys {
        tx.acquire_slot_lock(*key).await?;
    }
    debug!(court_id = slot.court_id, date = %slot.date, locks = keys.len(), "Slot locked");
    Ok(())
}

/// Count what blocks `slot`. Must run after `lock_slot` in the same
/// transaction; a count taken before the locks is stale by definition.
pub async fn inspect_slot(
    tx: &mut dyn SlotTransaction,
    slot: &Slot,
    consumed_hold: Option<&str>,
    now: DateTime<Utc>,
) -> StoreResult<SlotOccupancy> {
    let reservations = tx.count_overlapping_reservations(slot).await?;
    let holds = tx.count_active_holds(slot, now, consumed_hold).await?;
    Ok(SlotOccupancy { reservations, holds })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_occupancy() {
        let report = AvailabilityReport::from(SlotOccupancy { reservations: 0, holds: 2 });
        assert!(!report.available);
        assert_eq!(report.active_holds, 2);

        assert!(AvailabilityReport::from(SlotOccupancy { reservations: 0, holds: 0 }).available);
    }
}
