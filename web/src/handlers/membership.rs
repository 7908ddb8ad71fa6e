//! Membership endpoints.

use super::MessageResponse;
use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use spotbook_core::{MembershipUpdate, RecordStore};

/// Route failure text for membership updates.
pub const MSG_UPDATE_FAILED: &str = "Error updating membership";
/// Route failure text for membership lookups.
pub const MSG_CHECK_FAILED: &str = "Error checking user";
/// Success text for membership updates.
pub const MSG_MEMBERSHIP_UPDATED: &str = "Membership updated successfully.";

/// Query string of `GET /check-user`.
#[derive(Debug, Default, Deserialize)]
pub struct CheckUserQuery {
    /// Email to look up
    #[serde(default)]
    pub email: String,
}

/// `PUT /modify-membership`: set the paid flag (and optionally the tier) of
/// the reservation holding `email`. Other fields of the record are kept.
///
/// # Errors
///
/// - 400 for a missing email or paid flag
/// - 404 `User not found.`
/// - 500 `Error updating membership`
#[tracing::instrument(skip(state, payload))]
pub async fn modify_membership<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<MembershipUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(update) = payload.inspect_err(|_| metrics::record_membership_update("invalid"))?;

    match state.service.update_membership(update).await {
        Ok(()) => {
            metrics::record_membership_update("updated");
            Ok(Json(MessageResponse::new(MSG_MEMBERSHIP_UPDATED)))
        }
        Err(err) => {
            metrics::record_membership_update(metrics::membership_outcome(&err));
            Err(AppError::from_service(err, MSG_UPDATE_FAILED))
        }
    }
}

/// `GET /check-user?email=`: membership status of a reservation.
///
/// ```json
/// { "message": "User found. Membership status: paid (basic)." }
/// ```
///
/// # Errors
///
/// - 400 for a missing email
/// - 404 `User not found.`
/// - 500 `Error checking user`
#[tracing::instrument(skip(state, query))]
pub async fn check_user<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    query: Result<Query<CheckUserQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(CheckUserQuery { email }) = query?;

    let summary = state
        .service
        .check_user(&email)
        .await
        .map_err(|e| AppError::from_service(e, MSG_CHECK_FAILED))?;

    Ok(Json(MessageResponse::new(summary.message())))
}
