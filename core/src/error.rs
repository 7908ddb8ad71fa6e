//! Reservation service errors.

use crate::store::StoreError;
use thiserror::Error;

/// Client text for a request with blank required fields.
pub const MSG_ALL_FIELDS_REQUIRED: &str = "All fields are required.";
/// Client text for a lookup without an email.
pub const MSG_EMAIL_REQUIRED: &str = "Email is required.";
/// Client text for an update without a paid flag.
pub const MSG_MEMBERSHIP_STATUS_REQUIRED: &str = "Membership status is required.";
/// Client text for an unknown email.
pub const MSG_USER_NOT_FOUND: &str = "User not found.";
/// Client text for an empty collection.
pub const MSG_NO_RESERVATIONS: &str = "No reservations found.";

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Errors raised by [`ReservationService`](crate::service::ReservationService).
///
/// The `Display` text of the client-facing variants is exactly what the HTTP
/// surface returns in its `message` field.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// A required field is missing or blank.
    #[error("{0}")]
    Validation(String),

    /// The email already holds a reservation.
    #[error("Email already reserved a spot!")]
    DuplicateEmail,

    /// Every spot is taken.
    #[error("No more spots available!")]
    CapacityExceeded,

    /// No reservation matched the lookup.
    #[error("{0}")]
    NotFound(String),

    /// The record store failed.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// A stored document could not be read as a reservation.
    #[error("Record {key} is not a valid reservation: {source}")]
    Decode {
        /// Child key of the offending document
        key: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// A reservation could not be turned into a document.
    #[error("Failed to encode reservation: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ReservationError {
    /// Validation failure for blank required fields.
    #[must_use]
    pub fn all_fields_required() -> Self {
        Self::Validation(MSG_ALL_FIELDS_REQUIRED.to_string())
    }

    /// Validation failure for a missing email.
    #[must_use]
    pub fn email_required() -> Self {
        Self::Validation(MSG_EMAIL_REQUIRED.to_string())
    }

    /// Lookup miss for an email.
    #[must_use]
    pub fn user_not_found() -> Self {
        Self::NotFound(MSG_USER_NOT_FOUND.to_string())
    }

    /// `true` for failures caused by the caller rather than the backend.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::DuplicateEmail | Self::CapacityExceeded | Self::NotFound(_)
        )
    }
}
