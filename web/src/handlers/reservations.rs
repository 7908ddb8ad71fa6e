//! Capacity, booking and listing endpoints.
//!
//! - `GET /reservations` - occupancy snapshot
//! - `POST /reserve` - claim a spot
//! - `GET /reservations/all` - every stored reservation

use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Serialize;
use spotbook_core::{CapacitySnapshot, NewReservation, RecordStore, Records};

/// Route failure text for capacity and listing reads.
pub const MSG_FETCH_FAILED: &str = "Error fetching reservations";
/// Route failure text for bookings.
pub const MSG_RESERVE_FAILED: &str = "Error reserving spot";
/// Success text for bookings.
pub const MSG_RESERVED: &str = "Spot reserved!";

/// Response for a successful booking.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreated {
    /// Always [`MSG_RESERVED`]
    pub message: &'static str,
    /// Reservations held after this one, equal to the new record's key
    pub reserved_count: u64,
}

/// Current occupancy.
///
/// ```bash
/// curl http://localhost:5000/reservations
/// ```
///
/// ```json
/// { "reservedCount": 12, "availableSpots": 288, "maxCapacity": 300 }
/// ```
///
/// # Errors
///
/// 500 `Error fetching reservations` when the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn get_capacity<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<CapacitySnapshot>, AppError> {
    let snapshot = state
        .service
        .capacity()
        .await
        .map_err(|e| AppError::from_service(e, MSG_FETCH_FAILED))?;

    metrics::set_available_spots(snapshot.available_spots);
    Ok(Json(snapshot))
}

/// Claim a spot.
///
/// ```bash
/// curl -X POST http://localhost:5000/reserve \
///   -H 'content-type: application/json' \
///   -d '{"name":"Ada","email":"ada@x.com","phone":"555","sector":"tech",
///        "contactMethod":"email","message":"hi"}'
/// ```
///
/// ```json
/// { "message": "Spot reserved!", "reservedCount": 13 }
/// ```
///
/// # Errors
///
/// - 400 `All fields are required.`, `Email already reserved a spot!` or
///   `No more spots available!`
/// - 400 for a body that is not JSON
/// - 500 `Error reserving spot`
#[tracing::instrument(skip(state, payload))]
pub async fn reserve<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewReservation>, JsonRejection>,
) -> Result<Json<ReservationCreated>, AppError> {
    let Json(request) = payload.inspect_err(|_| metrics::record_reservation("invalid"))?;

    match state.service.create(request).await {
        Ok(reserved_count) => {
            metrics::record_reservation("created");
            metrics::set_available_spots(
                state
                    .service
                    .settings()
                    .max_capacity
                    .saturating_sub(reserved_count),
            );
            Ok(Json(ReservationCreated {
                message: MSG_RESERVED,
                reserved_count,
            }))
        }
        Err(err) => {
            metrics::record_reservation(metrics::reservation_outcome(&err));
            Err(AppError::from_service(err, MSG_RESERVE_FAILED))
        }
    }
}

/// Every stored reservation keyed by its record key.
///
/// # Errors
///
/// - 404 `No reservations found.`
/// - 500 `Error fetching reservations`
#[tracing::instrument(skip(state))]
pub async fn list_all<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Records>, AppError> {
    let records = state
        .service
        .list_all()
        .await
        .map_err(|e| AppError::from_service(e, MSG_FETCH_FAILED))?;

    tracing::debug!(count = records.len(), "Listing reservations");
    Ok(Json(records))
}
