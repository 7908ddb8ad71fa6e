//! # Spotbook Core
//!
//! Domain types and business rules for the Spotbook reservation backend.
//!
//! This crate is the functional heart of the system. It knows nothing about
//! HTTP or about any particular database; persistence is reached through the
//! [`RecordStore`](store::RecordStore) trait and time through the
//! [`Clock`](environment::Clock) trait, both injected at construction.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────┐
//! │  HTTP Surface (spotbook-web)│  ← routes, status codes, JSON
//! ├─────────────────────────────┤
//! │  ReservationService         │  ← capacity, duplicates, validation
//! ├─────────────────────────────┤
//! │  RecordStore                │  ← Firebase REST / in-memory
//! └─────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use spotbook_core::{NewReservation, ReservationService, ReservationSettings, SystemClock};
//! use std::sync::Arc;
//!
//! let service = ReservationService::new(
//!     Arc::new(store),
//!     ReservationSettings::default().with_max_capacity(2),
//!     Arc::new(SystemClock),
//! );
//!
//! let reserved = service
//!     .create(NewReservation::new("Ada", "ada@x.com", "555", "tech", "email", "hi"))
//!     .await?;
//! assert_eq!(reserved, 1);
//! ```

pub mod environment;
pub mod error;
pub mod reservation;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use error::{ReservationError, Result};
pub use reservation::{
    CapacitySnapshot, DEFAULT_MEMBERSHIP_TYPE, MembershipPaid, MembershipSummary,
    MembershipUpdate, NewReservation, Reservation, ReservationDefaults,
};
pub use service::{ReservationService, ReservationSettings};
pub use store::{RecordStore, Records, StoreError};
