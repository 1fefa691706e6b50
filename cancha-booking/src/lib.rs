pub mod availability;
pub mod error;
pub mod manager;
pub mod request;
pub mod sweeper;
pub mod worker;

pub use availability::{AvailabilityReport, SlotOccupancy};
pub use error::BookingError;
pub use manager::AtomicReservationManager;
pub use request::{ReservationOptions, ReservationReceipt, ReservationRequest};
pub use sweeper::ExpirySweeper;
pub use worker::run_sweeper;
