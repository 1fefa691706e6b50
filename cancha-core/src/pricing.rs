use serde::{Deserialize, Serialize};

use crate::models::BookingChannel;

/// Commission rate applied when the caller supplies none (3.5%).
pub const DEFAULT_COMMISSION_RATE: f64 = 0.035;

/// Price of a committed reservation.
///
/// The commission is bookkeeping only: the customer pays `base`, and the
/// platform settles its fee out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base: i32,
    pub commission: i32,
    #[serde(rename = "final")]
    pub final_price: i32,
}

impl PriceBreakdown {
    pub fn compute(base: i32, commission_rate: f64) -> Self {
        Self {
            base,
            commission: commission_for(base, commission_rate),
            final_price: base,
        }
    }
}

/// `round(price * rate)`, halves rounded away from zero.
pub fn commission_for(price: i32, rate: f64) -> i32 {
    (price as f64 * rate).round() as i32
}

/// Per-channel commission schedule used for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionRates {
    /// Bookings made by customers on the platform
    pub direct: f64,

    /// Bookings entered by a facility administrator
    pub administrative: f64,

    /// VAT charged on top of the commission itself
    pub vat_rate: f64,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            direct: DEFAULT_COMMISSION_RATE,
            administrative: 0.0175,
            vat_rate: 0.19,
        }
    }
}

/// Commission split into net amount and VAT.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionWithVat {
    pub net: i32,
    pub vat: i32,
    pub total: i32,
    pub rate: f64,
}

impl CommissionRates {
    pub fn rate_for(&self, channel: BookingChannel) -> f64 {
        match channel {
            BookingChannel::Direct => self.direct,
            BookingChannel::Administrative => self.administrative,
        }
    }

    pub fn commission_with_vat(&self, price: i32, channel: BookingChannel) -> CommissionWithVat {
        let rate = self.rate_for(channel);
        let net = commission_for(price, rate);
        let vat = commission_for(net, self.vat_rate);

        CommissionWithVat {
            net,
            vat,
            total: net + vat,
            rate,
        }
    }
}
