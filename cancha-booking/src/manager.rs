use std::sync::Arc;

use cancha_core::slot::DEFAULT_LOCK_GRANULARITY_MINUTES;
use cancha_core::{
    normalize_date, CodeGenerator, CoreError, DateInput, NewReservation, PriceBreakdown,
    RandomCodeGenerator, ReservationStatus, ReservationStore, Slot, SlotTransaction, StoreResult,
};
use chrono::{NaiveTime, Utc};
use tracing::{debug, error, info, warn};

use crate::availability::{inspect_slot, lock_slot, AvailabilityReport, SlotOccupancy};
use crate::error::BookingError;
use crate::request::{ReservationOptions, ReservationReceipt, ReservationRequest};
use crate::sweeper::ExpirySweeper;

/// Creates reservations so that no two active bookings of a court ever overlap.
///
/// Every attempt runs in one store transaction: take the slot's advisory
/// locks, re-check reservations and live holds, insert, consume the caller's
/// hold, commit. Locks are transaction scoped, so they are released on commit,
/// rollback, or when the connection goes away.
pub struct AtomicReservationManager {
    store: Arc<dyn ReservationStore>,
    sweeper: ExpirySweeper,
    codes: Arc<dyn CodeGenerator>,
    lock_granularity_minutes: u32,
}

impl AtomicReservationManager {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            sweeper: ExpirySweeper::new(Arc::clone(&store)),
            store,
            codes: Arc::new(RandomCodeGenerator),
            lock_granularity_minutes: DEFAULT_LOCK_GRANULARITY_MINUTES,
        }
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    /// Width of a lock segment. Must be the same for every process sharing a database.
    pub fn with_lock_granularity(mut self, minutes: u32) -> Self {
        self.lock_granularity_minutes = minutes.max(1);
        self
    }

    /// Book `request` if, and only if, its slot is free at commit time.
    pub async fn create_atomic_reservation(
        &self,
        request: &ReservationRequest,
        options: &ReservationOptions,
    ) -> Result<ReservationReceipt, BookingError> {
        self.sweeper.purge().await;

        let slot = resolve_slot(request.court_id, &request.date, request.start_time, request.end_time)
            .map_err(|e| log_failure(BookingError::from(e), request.court_id))?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| log_failure(BookingError::from(e), slot.court_id))?;

        match self.book_locked(tx.as_mut(), &slot, request, options).await {
            Ok(receipt) => {
                tx.commit()
                    .await
                    .map_err(|e| log_failure(BookingError::from(e), slot.court_id))?;
                info!(
                    court_id = slot.court_id,
                    date = %slot.date,
                    start = %slot.start,
                    end = %slot.end,
                    code = %receipt.code,
                    "Reservation created"
                );
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(log_failure(e, slot.court_id))
            }
        }
    }

    /// Everything between lock acquisition and commit.
    async fn book_locked(
        &self,
        tx: &mut dyn SlotTransaction,
        slot: &Slot,
        request: &ReservationRequest,
        options: &ReservationOptions,
    ) -> Result<ReservationReceipt, BookingError> {
        lock_slot(tx, slot, self.lock_granularity_minutes).await?;

        if !options.skip_availability_check {
            let occupancy = inspect_slot(tx, slot, request.hold_id.as_deref(), Utc::now()).await?;
            if occupancy.reservations > 0 {
                return Err(BookingError::NotAvailable);
            }
            if occupancy.holds > 0 {
                return Err(BookingError::TemporarilyBlocked);
            }
        }

        let code = self.codes.generate();
        let price = PriceBreakdown::compute(request.total_price, options.commission_rate);

        let new_reservation = NewReservation {
            code: code.clone(),
            slot: *slot,
            customer: request.customer.clone(),
            total_price: price.final_price,
            status: ReservationStatus::Confirmed,
            payment_status: request.payment_status,
            payment_method: request.payment_method.clone(),
            created_at: Utc::now(),
            channel: request.channel,
            commission: price.commission,
            admin_id: request.admin_id,
            paid_percentage: request.paid_percentage,
        };
        let reservation = tx.insert_reservation(&new_reservation).await?;

        if let Some(hold_id) = request.hold_id.as_deref() {
            if tx.delete_hold(hold_id).await? == 0 {
                debug!(hold_id, "Consumed hold was already gone");
            }
        }

        Ok(ReservationReceipt { reservation, code, price })
    }

    /// Report whether a slot is bookable right now.
    ///
    /// Takes the same locks as a booking so the answer is consistent, but it
    /// is advisory: nothing stops another caller from booking afterwards.
    pub async fn check_atomic_availability(
        &self,
        court_id: i32,
        date: impl Into<DateInput>,
        start_time: NaiveTime,
        end_time: NaiveTime,
        hold_id: Option<&str>,
    ) -> Result<AvailabilityReport, BookingError> {
        self.sweeper.purge().await;

        let slot = resolve_slot(court_id, &date.into(), start_time, end_time)
            .map_err(|e| log_failure(BookingError::from(e), court_id))?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| log_failure(BookingError::from(e), court_id))?;

        match self.probe_locked(tx.as_mut(), &slot, hold_id).await {
            Ok(occupancy) => {
                tx.commit()
                    .await
                    .map_err(|e| log_failure(BookingError::from(e), court_id))?;
                Ok(occupancy.into())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(log_failure(BookingError::from(e), court_id))
            }
        }
    }

    async fn probe_locked(
        &self,
        tx: &mut dyn SlotTransaction,
        slot: &Slot,
        hold_id: Option<&str>,
    ) -> StoreResult<SlotOccupancy> {
        lock_slot(tx, slot, self.lock_granularity_minutes).await?;
        inspect_slot(tx, slot, hold_id, Utc::now()).await
    }
}

fn resolve_slot(
    court_id: i32,
    date: &DateInput,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Slot, CoreError> {
    let date = normalize_date(date)?;
    Slot::new(court_id, date, start_time, end_time)
}

fn log_failure(err: BookingError, court_id: i32) -> BookingError {
    if err.is_contention() {
        info!(court_id, code = err.code(), "Booking rejected: {}", err);
    } else {
        error!(court_id, code = err.code(), "Booking failed: {}", err);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use cancha_core::{BookingChannel, CustomerInfo, TemporaryHold};
    use cancha_store::InMemoryReservationStore;
    use chrono::{Duration, NaiveDate};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn request(court_id: i32, start: NaiveTime, end: NaiveTime) -> ReservationRequest {
        ReservationRequest {
            court_id,
            date: "2025-10-10".into(),
            start_time: start,
            end_time: end,
            customer: CustomerInfo {
                name: "Camila Rojas".to_string(),
                email: Some("camila@example.com".to_string()),
                ..Default::default()
            },
            total_price: 28000,
            channel: BookingChannel::Direct,
            admin_id: None,
            hold_id: None,
            paid_percentage: 100,
            payment_method: None,
            payment_status: Default::default(),
        }
    }

    fn manager(store: &InMemoryReservationStore) -> AtomicReservationManager {
        AtomicReservationManager::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_create_reservation() {
        let store = InMemoryReservationStore::new();
        let receipt = manager(&store)
            .create_atomic_reservation(&request(1, time(18, 0), time(19, 0)), &ReservationOptions::default())
            .await
            .unwrap();

        assert_eq!(receipt.price.base, 28000);
        assert_eq!(receipt.price.final_price, 28000);
        assert_eq!(receipt.price.commission, 980);
        assert_eq!(receipt.reservation.status, ReservationStatus::Confirmed);
        assert_eq!(receipt.reservation.code, receipt.code);
        assert!(!receipt.reservation.created_by_admin);
        assert_eq!(store.reservations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_second_booking_is_not_available() {
        let store = InMemoryReservationStore::new();
        let manager = manager(&store);
        let options = ReservationOptions::default();

        manager.create_atomic_reservation(&request(1, time(18, 0), time(19, 0)), &options).await.unwrap();
        let err = manager
            .create_atomic_reservation(&request(1, time(18, 30), time(19, 30)), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::NotAvailable));
        assert_eq!(store.reservations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_hold_blocks_and_own_hold_is_consumed() {
        let store = InMemoryReservationStore::new();
        let manager = manager(&store);
        let slot = Slot::new(2, NaiveDate::from_ymd_opt(2025, 10, 10).unwrap(), time(10, 0), time(11, 0)).unwrap();
        let hold = TemporaryHold::new(slot, "checkout-1", Duration::minutes(10));
        let hold_id = hold.id.clone();
        store.insert_hold(hold).await;

        let err = manager
            .create_atomic_reservation(&request(2, time(10, 0), time(11, 0)), &ReservationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::TemporarilyBlocked));

        let mut own = request(2, time(10, 0), time(11, 0));
        own.hold_id = Some(hold_id.clone());
        manager.create_atomic_reservation(&own, &ReservationOptions::default()).await.unwrap();
        assert!(store.find_hold(&hold_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_date_is_internal() {
        let store = InMemoryReservationStore::new();
        let mut req = request(1, time(18, 0), time(19, 0));
        req.date = "not a date".into();

        let err = manager(&store)
            .create_atomic_reservation(&req, &ReservationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(matches!(err, BookingError::Internal(CoreError::InvalidDate(_))));
    }

    #[tokio::test]
    async fn test_check_availability() {
        let store = InMemoryReservationStore::new();
        let manager = manager(&store);

        let report = manager.check_atomic_availability(1, "2025-10-10", time(18, 0), time(19, 0), None).await.unwrap();
        assert!(report.available);

        manager
            .create_atomic_reservation(&request(1, time(18, 0), time(19, 0)), &ReservationOptions::default())
            .await
            .unwrap();

        let report = manager.check_atomic_availability(1, "2025-10-10", time(18, 30), time(20, 0), None).await.unwrap();
        assert!(!report.available);
        assert_eq!(report.existing_reservations, 1);
        assert_eq!(report.active_holds, 0);
    }
}
