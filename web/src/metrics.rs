//! Business metrics for the reservation API.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `spotbook_reservations_total{outcome}` - reservation attempts by outcome
//!   (created, duplicate, full, invalid, failed)
//! - `spotbook_membership_updates_total{outcome}` - membership updates by
//!   outcome (updated, not_found, invalid, failed)
//!
//! ## Gauges
//! - `spotbook_available_spots` - free spots at the last capacity read

use metrics::{describe_counter, describe_gauge};
use spotbook_core::ReservationError;

const RESERVATIONS_TOTAL: &str = "spotbook_reservations_total";
const MEMBERSHIP_UPDATES_TOTAL: &str = "spotbook_membership_updates_total";
const AVAILABLE_SPOTS: &str = "spotbook_available_spots";

/// Register metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        RESERVATIONS_TOTAL,
        "Reservation attempts by outcome (created, duplicate, full, invalid, failed)"
    );
    describe_counter!(
        MEMBERSHIP_UPDATES_TOTAL,
        "Membership updates by outcome (updated, not_found, invalid, failed)"
    );
    describe_gauge!(AVAILABLE_SPOTS, "Free spots at the last capacity read");

    tracing::info!("Business metrics registered");
}

/// Count a reservation attempt.
pub fn record_reservation(outcome: &'static str) {
    metrics::counter!(RESERVATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count a membership update.
pub fn record_membership_update(outcome: &'static str) {
    metrics::counter!(MEMBERSHIP_UPDATES_TOTAL, "outcome" => outcome).increment(1);
}

/// Publish the number of free spots.
#[allow(clippy::cast_precision_loss)] // capacities are far below 2^52
pub fn set_available_spots(available: u64) {
    metrics::gauge!(AVAILABLE_SPOTS).set(available as f64);
}

/// Outcome label of a failed reservation attempt.
#[must_use]
pub const fn reservation_outcome(err: &ReservationError) -> &'static str {
    match err {
        ReservationError::Validation(_) => "invalid",
        ReservationError::DuplicateEmail => "duplicate",
        ReservationError::CapacityExceeded => "full",
        _ => "failed",
    }
}

/// Outcome label of a failed membership update.
#[must_use]
pub const fn membership_outcome(err: &ReservationError) -> &'static str {
    match err {
        ReservationError::Validation(_) => "invalid",
        ReservationError::NotFound(_) => "not_found",
        _ => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotbook_core::StoreError;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(reservation_outcome(&ReservationError::CapacityExceeded), "full");
        assert_eq!(reservation_outcome(&ReservationError::DuplicateEmail), "duplicate");
        assert_eq!(
            reservation_outcome(&ReservationError::all_fields_required()),
            "invalid"
        );
        assert_eq!(
            membership_outcome(&ReservationError::user_not_found()),
            "not_found"
        );
        assert_eq!(
            membership_outcome(&ReservationError::Store(StoreError::Unavailable(
                "down".to_string()
            ))),
            "failed"
        );
    }
}
