use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{NewReservation, Reservation, TemporaryHold};
use crate::slot::Slot;
use crate::StoreResult;

/// Storage for reservations and temporary holds.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Open a transaction. Locks taken through it live until commit or rollback.
    async fn begin(&self) -> StoreResult<Box<dyn SlotTransaction>>;

    /// Delete every hold whose expiry is at or before `now`.
    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    async fn find_reservation_by_code(&self, code: &str) -> StoreResult<Option<Reservation>>;

    async fn list_reservations(&self, court_id: i32, date: NaiveDate) -> StoreResult<Vec<Reservation>>;

    async fn find_hold(&self, hold_id: &str) -> StoreResult<Option<TemporaryHold>>;
}

/// One database transaction scoped to booking work.
///
/// Dropping it without `commit` rolls it back and releases every lock it holds.
#[async_trait]
pub trait SlotTransaction: Send {
    /// Block until the transaction-scoped advisory lock `key` is held.
    async fn acquire_slot_lock(&mut self, key: i64) -> StoreResult<()>;

    /// Non-cancelled reservations overlapping `slot`.
    async fn count_overlapping_reservations(&mut self, slot: &Slot) -> StoreResult<i64>;

    /// Holds overlapping `slot` that are unexpired at `now`, ignoring `excluding`.
    async fn count_active_holds(
        &mut self,
        slot: &Slot,
        now: DateTime<Utc>,
        excluding: Option<&str>,
    ) -> StoreResult<i64>;

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation>;

    async fn delete_hold(&mut self, hold_id: &str) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
