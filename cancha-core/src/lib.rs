pub mod code;
pub mod dates;
pub mod models;
pub mod pricing;
pub mod repository;
pub mod slot;

pub use code::{CodeGenerator, RandomCodeGenerator};
pub use dates::{normalize_date, DateInput};
pub use models::{
    BookingChannel, CustomerInfo, NewReservation, PaymentStatus, Reservation, ReservationStatus,
    TemporaryHold,
};
pub use pricing::{CommissionRates, PriceBreakdown, DEFAULT_COMMISSION_RATE};
pub use repository::{ReservationStore, SlotTransaction};
pub use slot::Slot;

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend(err.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid slot: {0}")]
    InvalidSlot(String),
    #[error("Invalid value for {field}: {value}")]
    InvalidLabel { field: &'static str, value: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
pub type StoreResult<T> = Result<T, StoreError>;
