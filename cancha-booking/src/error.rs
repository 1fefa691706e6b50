use cancha_core::{CoreError, StoreError};

/// Why a booking attempt was aborted.
///
/// `NotAvailable` and `TemporarilyBlocked` are ordinary outcomes under
/// contention; the customer can pick another slot. `Internal` carries the
/// underlying cause for server-side diagnostics only.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Court is no longer available for the requested time")]
    NotAvailable,

    #[error("Court is temporarily held by another customer")]
    TemporarilyBlocked,

    #[error("Internal booking error: {0}")]
    Internal(#[source] CoreError),
}

impl BookingError {
    /// Stable code handed to callers (`NOT_AVAILABLE`, `TEMPORARILY_BLOCKED`, `INTERNAL_ERROR`)
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotAvailable => "NOT_AVAILABLE",
            BookingError::TemporarilyBlocked => "TEMPORARILY_BLOCKED",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            BookingError::NotAvailable => "The court is no longer available at that time",
            BookingError::TemporarilyBlocked => "The court is temporarily held by another user",
            BookingError::Internal(_) => "Something went wrong while creating the reservation, please try again",
        }
    }

    pub fn is_contention(&self) -> bool {
        matches!(self, BookingError::NotAvailable | BookingError::TemporarilyBlocked)
    }

    /// True when the store rejected a duplicate reservation code; retrying
    /// draws a fresh code.
    pub fn is_code_collision(&self) -> bool {
        matches!(self, BookingError::Internal(CoreError::Store(StoreError::UniqueViolation(_))))
    }
}

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        BookingError::Internal(err)
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::Internal(CoreError::Store(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_contention() {
        assert_eq!(BookingError::NotAvailable.code(), "NOT_AVAILABLE");
        assert_eq!(BookingError::TemporarilyBlocked.code(), "TEMPORARILY_BLOCKED");
        assert!(BookingError::TemporarilyBlocked.is_contention());

        let internal = BookingError::from(StoreError::UniqueViolation("reservas_codigo_reserva_key".into()));
        assert_eq!(internal.code(), "INTERNAL_ERROR");
        assert!(!internal.is_contention());
        assert!(internal.is_code_collision());
    }

    #[test]
    fn test_user_message_hides_cause() {
        let err = BookingError::from(CoreError::InvalidDate("garbage".into()));
        assert!(!err.user_message().contains("garbage"));
        assert!(err.to_string().contains("garbage"));
    }
}
