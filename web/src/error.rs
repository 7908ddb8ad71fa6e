//! Error type for web handlers.
//!
//! Bridges [`ReservationError`] and extractor rejections to HTTP responses
//! with a `{"message": "..."}` body.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use spotbook_core::ReservationError;
use std::fmt;

/// Application error type for web handlers.
///
/// Carries the status and the client-facing message. Server errors keep
/// their cause as `source`, which is logged but never sent to the client.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<S>>) -> Result<Json<Records>, AppError> {
///     let all = state.service.list_all().await
///         .map_err(|e| AppError::from_service(e, "Error fetching reservations"))?;
///     Ok(Json(all))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// Map a service error.
    ///
    /// Caller mistakes keep the service's own message (400, or 404 for
    /// lookups that found nothing). Backend failures become a 500 carrying
    /// `failure_message`, the route's generic text.
    #[must_use]
    pub fn from_service(err: ReservationError, failure_message: &str) -> Self {
        match err {
            ReservationError::Validation(_)
            | ReservationError::DuplicateEmail
            | ReservationError::CapacityExceeded => Self::bad_request(err.to_string()),
            ReservationError::NotFound(_) => Self::not_found(err.to_string()),
            ReservationError::Store(_)
            | ReservationError::Decode { .. }
            | ReservationError::Encode(_) => {
                Self::internal(failure_message).with_source(anyhow::Error::new(err))
            }
        }
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            let cause = self
                .source
                .as_ref()
                .map(|source| format!("{source:#}"))
                .unwrap_or_default();
            tracing::error!(
                status = %self.status,
                message = %self.message,
                error = %cause,
                "Request failed"
            );
        } else {
            tracing::warn!(
                status = %self.status,
                message = %self.message,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
