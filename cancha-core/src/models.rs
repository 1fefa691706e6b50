use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slot::Slot;
use crate::CoreError;

/// Reservation status as persisted in `reservas.estado`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmada",
            ReservationStatus::Cancelled => "cancelada",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmada" => Ok(ReservationStatus::Confirmed),
            "cancelada" => Ok(ReservationStatus::Cancelled),
            other => Err(CoreError::InvalidLabel { field: "estado", value: other.to_string() }),
        }
    }
}

/// How the booking entered the platform
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingChannel {
    #[default]
    Direct,
    Administrative,
}

impl BookingChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingChannel::Direct => "directa",
            BookingChannel::Administrative => "administrativa",
        }
    }
}

impl FromStr for BookingChannel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directa" => Ok(BookingChannel::Direct),
            "administrativa" => Ok(BookingChannel::Administrative),
            other => Err(CoreError::InvalidLabel { field: "tipo_reserva", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pendiente",
            PaymentStatus::Paid => "pagado",
            PaymentStatus::Refunded => "reembolsado",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(PaymentStatus::Pending),
            "pagado" => Ok(PaymentStatus::Paid),
            "reembolsado" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::InvalidLabel { field: "estado_pago", value: other.to_string() }),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// National id (RUT)
    #[serde(default)]
    pub national_id: Option<String>,
}

/// A reservation about to be inserted. Everything but the row id is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub code: String,
    pub slot: Slot,
    pub customer: CustomerInfo,
    pub total_price: i32,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub channel: BookingChannel,
    pub commission: i32,
    pub admin_id: Option<i32>,
    pub paid_percentage: i32,
}

impl NewReservation {
    pub fn created_by_admin(&self) -> bool {
        self.admin_id.is_some()
    }

    pub fn into_reservation(self, id: i32) -> Reservation {
        Reservation {
            id,
            created_by_admin: self.created_by_admin(),
            code: self.code,
            court_id: self.slot.court_id,
            date: self.slot.date,
            start_time: self.slot.start,
            end_time: self.slot.end,
            customer: self.customer,
            total_price: self.total_price,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            created_at: self.created_at,
            channel: self.channel,
            commission: self.commission,
            admin_id: self.admin_id,
            paid_percentage: self.paid_percentage,
        }
    }
}

/// A committed booking. Never mutated by the booking core once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: i32,
    pub code: String,
    pub court_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub customer: CustomerInfo,
    pub total_price: i32,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub channel: BookingChannel,
    /// Informational; never added to `total_price`
    pub commission: i32,
    pub created_by_admin: bool,
    pub admin_id: Option<i32>,
    pub paid_percentage: i32,
}

impl Reservation {
    pub fn slot(&self) -> Slot {
        Slot {
            court_id: self.court_id,
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Whether the reservation still occupies its slot
    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }
}

/// Soft reservation held while a customer is in checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemporaryHold {
    pub id: String,
    pub court_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Serialized customer intent, opaque to the booking core
    pub customer_payload: Option<String>,
}

impl TemporaryHold {
    pub fn new(slot: Slot, session_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            court_id: slot.court_id,
            date: slot.date,
            start_time: slot.start,
            end_time: slot.end,
            session_id: session_id.into(),
            expires_at: now + ttl,
            created_at: now,
            customer_payload: None,
        }
    }

    pub fn slot(&self) -> Slot {
        Slot {
            court_id: self.court_id,
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// A hold obstructs its slot only strictly before its expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> Slot {
        Slot::new(
            1,
            NaiveDate::from_ymd_opt(2025, 10, 10).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_labels_round_trip_through_persisted_form() {
        assert_eq!("confirmada".parse::<ReservationStatus>().unwrap(), ReservationStatus::Confirmed);
        assert_eq!("administrativa".parse::<BookingChannel>().unwrap(), BookingChannel::Administrative);
        assert_eq!(PaymentStatus::Paid.to_string(), "pagado");
        assert!("pending".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_hold_expiry_boundary() {
        let hold = TemporaryHold::new(slot(), "session-1", Duration::minutes(10));
        assert!(hold.is_active(hold.created_at));
        assert!(!hold.is_active(hold.expires_at));
        assert_eq!(hold.slot(), slot());
    }

    #[test]
    fn test_admin_flag_follows_admin_id() {
        let new = NewReservation {
            code: "AB12CD".to_string(),
            slot: slot(),
            customer: CustomerInfo { name: "Ana".to_string(), ..Default::default() },
            total_price: 28000,
            status: ReservationStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            created_at: Utc::now(),
            channel: BookingChannel::Administrative,
            commission: 490,
            admin_id: Some(7),
            paid_percentage: 100,
        };

        let reservation = new.into_reservation(42);
        assert!(reservation.created_by_admin);
        assert_eq!(reservation.slot(), slot());
        assert!(reservation.is_active());
    }
}
