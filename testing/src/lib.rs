//! # Spotbook Testing
//!
//! Testing utilities for the Spotbook reservation backend.
//!
//! This crate provides:
//! - [`InMemoryRecordStore`]: a `RecordStore` backed by a JSON tree
//! - [`FixedClock`]: deterministic time
//! - Fixtures for building requests and services
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use spotbook_testing::fixtures;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (service, store) = fixtures::service_with_capacity(2);
//!
//! let reserved = service.create(fixtures::reservation("a@x.com")).await?;
//! assert_eq!(reserved, 1);
//! assert_eq!(store.snapshot()["reservations"]["1"]["email"], "a@x.com");
//! # Ok(())
//! # }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

mod memory;

pub use memory::InMemoryRecordStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use spotbook_core::environment::Clock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use spotbook_testing::mocks::FixedClock;
    /// use spotbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test scenarios.
pub mod fixtures {
    use super::InMemoryRecordStore;
    use super::mocks::test_clock;
    use spotbook_core::{NewReservation, ReservationService, ReservationSettings};
    use std::sync::Arc;

    /// A complete reservation request for `email`.
    #[must_use]
    pub fn reservation(email: &str) -> NewReservation {
        NewReservation::new(
            "Test Person",
            email,
            "555-0100",
            "technology",
            "email",
            "Looking forward to it",
        )
    }

    /// Service over a fresh in-memory store with the given capacity.
    ///
    /// The store handle is returned too so tests can inspect what was
    /// written.
    #[must_use]
    pub fn service_with_capacity(
        max_capacity: u64,
    ) -> (ReservationService<InMemoryRecordStore>, Arc<InMemoryRecordStore>) {
        service_over(InMemoryRecordStore::new(), max_capacity)
    }

    /// Service over an existing store.
    #[must_use]
    pub fn service_over(
        store: InMemoryRecordStore,
        max_capacity: u64,
    ) -> (ReservationService<InMemoryRecordStore>, Arc<InMemoryRecordStore>) {
        let store = Arc::new(store);
        let service = ReservationService::new(
            Arc::clone(&store),
            ReservationSettings::default().with_max_capacity(max_capacity),
            Arc::new(test_clock()),
        );
        (service, store)
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;
    use spotbook_core::NewReservation;

    /// Distinct, well-formed emails.
    pub fn emails(
        count: impl Into<proptest::collection::SizeRange>,
    ) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-z]{1,8}@[a-z]{1,6}\\.com", count)
            .prop_map(|set| set.into_iter().collect())
    }

    /// Complete reservation requests with arbitrary printable content.
    pub fn reservation() -> impl Strategy<Value = NewReservation> {
        (
            "[A-Za-z][A-Za-z ]{0,20}",
            "[a-z]{1,8}@[a-z]{1,6}\\.com",
            "[0-9]{3}-[0-9]{4}",
            "[a-z]{1,12}",
            prop_oneof![Just("email"), Just("phone"), Just("whatsapp")],
            "[A-Za-z0-9][A-Za-z0-9 ]{0,39}",
        )
            .prop_map(|(name, email, phone, sector, contact, message)| {
                NewReservation::new(name, email, phone, sector, contact, message)
            })
    }
}

/// Install a test subscriber that prints `tracing` output captured by the
/// test harness. Safe to call from several tests.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("spotbook=debug")
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use spotbook_core::environment::Clock;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }
}
