//! HTTP request handlers.

pub mod health;
pub mod membership;
pub mod reservations;

pub use health::{health_check, metrics_endpoint};
pub use membership::{check_user, modify_membership};
pub use reservations::{get_capacity, list_all, reserve};

use serde::Serialize;

/// Plain `{"message": "..."}` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

impl MessageResponse {
    /// Wrap `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
