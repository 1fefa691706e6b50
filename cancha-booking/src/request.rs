use cancha_core::{
    BookingChannel, CommissionRates, CustomerInfo, DateInput, PaymentStatus, PriceBreakdown,
    Reservation, DEFAULT_COMMISSION_RATE,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A booking request as handed over by the (already authenticated) caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub court_id: i32,
    pub date: DateInput,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub customer: CustomerInfo,
    pub total_price: i32,
    #[serde(default)]
    pub channel: BookingChannel,
    #[serde(default)]
    pub admin_id: Option<i32>,
    /// Hold this booking consumes, if the customer went through checkout
    #[serde(default)]
    pub hold_id: Option<String>,
    #[serde(default = "default_paid_percentage")]
    pub paid_percentage: i32,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
}

fn default_paid_percentage() -> i32 {
    100
}

/// Per-call knobs. Nothing here is global state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservationOptions {
    /// Only for trusted callers that validated availability themselves;
    /// the slot locks are still taken.
    pub skip_availability_check: bool,
    pub commission_rate: f64,
}

impl Default for ReservationOptions {
    fn default() -> Self {
        Self {
            skip_availability_check: false,
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

impl ReservationOptions {
    pub fn for_channel(channel: BookingChannel, rates: &CommissionRates) -> Self {
        Self {
            commission_rate: rates.rate_for(channel),
            ..Self::default()
        }
    }
}

/// What a successful booking hands back.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationReceipt {
    pub reservation: Reservation,
    #[serde(rename = "codigo_reserva")]
    pub code: String,
    pub price: PriceBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ReservationRequest = serde_json::from_value(serde_json::json!({
            "court_id": 1,
            "date": "2025-10-10",
            "start_time": "18:00:00",
            "end_time": "19:00:00",
            "customer": { "name": "Ana Pérez" },
            "total_price": 28000
        }))
        .unwrap();

        assert_eq!(req.channel, BookingChannel::Direct);
        assert_eq!(req.paid_percentage, 100);
        assert_eq!(req.payment_status, PaymentStatus::Pending);
        assert!(req.hold_id.is_none());
        assert!(req.customer.email.is_none());
    }

    #[test]
    fn test_options_per_channel() {
        let rates = CommissionRates::default();
        assert_eq!(ReservationOptions::default().commission_rate, 0.035);
        assert_eq!(
            ReservationOptions::for_channel(BookingChannel::Administrative, &rates).commission_rate,
            0.0175
        );
    }
}
