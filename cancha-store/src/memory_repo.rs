use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cancha_core::{
    NewReservation, Reservation, ReservationStore, Slot, SlotTransaction, StoreError, StoreResult,
    TemporaryHold,
};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

const CODE_CONSTRAINT: &str = "reservas_codigo_reserva_key";

/// In-process store with the same isolation the Postgres store relies on.
///
/// Advisory locks are real async mutexes held until the transaction ends.
/// Writes are staged per transaction and published on commit, so other
/// transactions never observe them early (read committed).
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<MemoryState>,
    locks: DashMap<i64, Arc<Mutex<()>>>,
    next_id: AtomicI32,
}

#[derive(Default)]
struct MemoryState {
    reservations: Vec<Reservation>,
    holds: HashMap<String, TemporaryHold>,
}

impl MemoryState {
    fn code_taken(&self, code: &str) -> bool {
        self.reservations.iter().any(|r| r.code == code)
    }
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds are written by the checkout flow, outside the booking core.
    pub async fn insert_hold(&self, hold: TemporaryHold) {
        let mut state = self.inner.state.lock().await;
        state.holds.insert(hold.id.clone(), hold);
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.inner.state.lock().await.reservations.clone()
    }

    pub async fn holds(&self) -> Vec<TemporaryHold> {
        self.inner.state.lock().await.holds.values().cloned().collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn begin(&self) -> StoreResult<Box<dyn SlotTransaction>> {
        Ok(Box::new(MemorySlotTransaction {
            inner: Arc::clone(&self.inner),
            held_keys: HashSet::new(),
            guards: Vec::new(),
            inserted: Vec::new(),
            deleted_holds: HashSet::new(),
        }))
    }

    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.inner.state.lock().await;
        let before = state.holds.len();
        state.holds.retain(|_, hold| hold.expires_at > now);
        Ok((before - state.holds.len()) as u64)
    }

    async fn find_reservation_by_code(&self, code: &str) -> StoreResult<Option<Reservation>> {
        let state = self.inner.state.lock().await;
        Ok(state.reservations.iter().find(|r| r.code == code).cloned())
    }

    async fn list_reservations(&self, court_id: i32, date: NaiveDate) -> StoreResult<Vec<Reservation>> {
        let state = self.inner.state.lock().await;
        let mut found: Vec<Reservation> = state
            .reservations
            .iter()
            .filter(|r| r.court_id == court_id && r.date == date)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.start_time);
        Ok(found)
    }

    async fn find_hold(&self, hold_id: &str) -> StoreResult<Option<TemporaryHold>> {
        Ok(self.inner.state.lock().await.holds.get(hold_id).cloned())
    }
}

pub struct MemorySlotTransaction {
    inner: Arc<Inner>,
    held_keys: HashSet<i64>,
    guards: Vec<OwnedMutexGuard<()>>,
    inserted: Vec<Reservation>,
    deleted_holds: HashSet<String>,
}

#[async_trait]
impl SlotTransaction for MemorySlotTransaction {
    async fn acquire_slot_lock(&mut self, key: i64) -> StoreResult<()> {
        // Re-entrant within one transaction, like pg_advisory_xact_lock
        if self.held_keys.contains(&key) {
            return Ok(());
        }
        let mutex = self.inner.locks.entry(key).or_default().clone();
        self.guards.push(mutex.lock_owned().await);
        self.held_keys.insert(key);
        Ok(())
    }

    async fn count_overlapping_reservations(&mut self, slot: &Slot) -> StoreResult<i64> {
        let state = self.inner.state.lock().await;
        let count = state
            .reservations
            .iter()
            .chain(self.inserted.iter())
            .filter(|r| r.is_active() && r.slot().overlaps(slot))
            .count();
        Ok(count as i64)
    }

    async fn count_active_holds(
        &mut self,
        slot: &Slot,
        now: DateTime<Utc>,
        excluding: Option<&str>,
    ) -> StoreResult<i64> {
        let state = self.inner.state.lock().await;
        let count = state
            .holds
            .values()
            .filter(|h| !self.deleted_holds.contains(&h.id))
            .filter(|h| excluding != Some(h.id.as_str()))
            .filter(|h| h.is_active(now) && h.slot().overlaps(slot))
            .count();
        Ok(count as i64)
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let state = self.inner.state.lock().await;
        if state.code_taken(&reservation.code) || self.inserted.iter().any(|r| r.code == reservation.code) {
            return Err(StoreError::UniqueViolation(CODE_CONSTRAINT.to_string()));
        }
        drop(state);

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = reservation.clone().into_reservation(id);
        self.inserted.push(row.clone());
        Ok(row)
    }

    async fn delete_hold(&mut self, hold_id: &str) -> StoreResult<u64> {
        let state = self.inner.state.lock().await;
        if state.holds.contains_key(hold_id) && self.deleted_holds.insert(hold_id.to_string()) {
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut state = self.inner.state.lock().await;

        // A concurrent transaction may have published the same code since our insert
        if self.inserted.iter().any(|r| state.code_taken(&r.code)) {
            return Err(StoreError::UniqueViolation(CODE_CONSTRAINT.to_string()));
        }

        state.reservations.extend(self.inserted.iter().cloned());
        for hold_id in &self.deleted_holds {
            state.holds.remove(hold_id);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

impl Drop for MemorySlotTransaction {
    fn drop(&mut self) {
        self.guards.clear();
        // Forget lock entries nobody else holds or waits on
        for key in &self.held_keys {
            self.inner.locks.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}
