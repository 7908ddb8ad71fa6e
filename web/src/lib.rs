//! HTTP surface of the Spotbook reservation backend.
//!
//! Thin Axum handlers over [`ReservationService`](spotbook_core::ReservationService):
//! each one extracts the request, calls the service, and maps the outcome
//! to JSON. Business rules live in `spotbook-core`; this crate only owns
//! status codes, client messages, metrics and middleware.
//!
//! # Request Flow
//!
//! 1. **Request ID** is read or generated and a span opened
//! 2. **Extract** JSON body or query string (rejections become 400)
//! 3. **Call** the service
//! 4. **Map** the result: caller mistakes keep the service's message,
//!    backend failures get the route's generic text
//!
//! # Example
//!
//! ```no_run
//! use spotbook_testing::fixtures;
//! use spotbook_web::{AppState, build_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (service, _store) = fixtures::service_with_capacity(300);
//! let app = build_router(AppState::new(service));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use router::build_router;
pub use state::AppState;
