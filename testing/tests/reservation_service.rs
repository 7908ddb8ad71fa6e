//! Reservation service behaviour over the in-memory record store.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use spotbook_core::store::{RecordStore, Records, StoreError};
use spotbook_core::{
    MembershipPaid, MembershipUpdate, NewReservation, ReservationError, ReservationService,
    ReservationSettings,
};
use spotbook_testing::mocks::test_clock;
use spotbook_testing::{InMemoryRecordStore, fixtures, init_test_tracing, properties};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// GetCapacity
// ============================================================================

#[tokio::test]
async fn test_capacity_of_empty_collection() {
    let (service, _store) = fixtures::service_with_capacity(300);

    let snapshot = service.capacity().await.unwrap();

    assert_eq!(snapshot.reserved_count, 0);
    assert_eq!(snapshot.available_spots, 300);
    assert_eq!(snapshot.max_capacity, 300);
}

#[tokio::test]
async fn test_capacity_counts_legacy_array_collection() {
    let store = InMemoryRecordStore::with_data(json!({
        "reservations": [null, { "email": "a@x.com" }, { "email": "b@x.com" }]
    }));
    let (service, _store) = fixtures::service_over(store, 5);

    let snapshot = service.capacity().await.unwrap();

    assert_eq!(snapshot.reserved_count, 2);
    assert_eq!(snapshot.available_spots, 3);
}

#[tokio::test]
async fn test_capacity_zero_means_closed() {
    let (service, store) = fixtures::service_with_capacity(0);

    assert!(service.capacity().await.unwrap().is_full());
    assert!(matches!(
        service.create(fixtures::reservation("a@x.com")).await,
        Err(ReservationError::CapacityExceeded)
    ));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_capacity_store_failure() {
    let (service, store) = fixtures::service_with_capacity(10);
    store.set_unavailable(true);

    assert!(matches!(
        service.capacity().await,
        Err(ReservationError::Store(_))
    ));
}

// ============================================================================
// CreateReservation
// ============================================================================

#[tokio::test]
async fn test_capacity_two_scenario() {
    init_test_tracing();
    let (service, _store) = fixtures::service_with_capacity(2);

    assert_eq!(service.create(fixtures::reservation("a@x.com")).await.unwrap(), 1);
    assert_eq!(service.create(fixtures::reservation("b@x.com")).await.unwrap(), 2);

    let err = service
        .create(fixtures::reservation("c@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::CapacityExceeded));
    assert_eq!(err.to_string(), "No more spots available!");
}

#[tokio::test]
async fn test_missing_name_is_rejected() {
    let (service, store) = fixtures::service_with_capacity(10);
    let mut request = fixtures::reservation("a@x.com");
    request.name = String::new();

    let err = service.create(request).await.unwrap_err();

    assert!(matches!(err, ReservationError::Validation(_)));
    assert_eq!(err.to_string(), "All fields are required.");
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let (service, _store) = fixtures::service_with_capacity(10);
    service.create(fixtures::reservation("a@x.com")).await.unwrap();

    let mut again = fixtures::reservation("a@x.com");
    again.name = "Somebody Else".to_string();
    again.sector = "finance".to_string();
    let err = service.create(again).await.unwrap_err();

    assert!(matches!(err, ReservationError::DuplicateEmail));
    assert_eq!(err.to_string(), "Email already reserved a spot!");
    assert_eq!(service.capacity().await.unwrap().reserved_count, 1);
}

#[tokio::test]
async fn test_duplicate_check_ignores_surrounding_whitespace() {
    let (service, _store) = fixtures::service_with_capacity(10);
    service.create(fixtures::reservation("a@x.com")).await.unwrap();

    assert!(matches!(
        service.create(fixtures::reservation("  a@x.com ")).await,
        Err(ReservationError::DuplicateEmail)
    ));
}

#[tokio::test]
async fn test_created_record_has_defaults_and_timestamp() {
    let (service, store) = fixtures::service_with_capacity(10);

    service.create(fixtures::reservation("a@x.com")).await.unwrap();

    let record = store.get_by_path("reservations/1").await.unwrap().unwrap();
    assert_eq!(record["email"], "a@x.com");
    assert_eq!(record["contactMethod"], "email");
    assert_eq!(record["membershipPaid"], false);
    assert_eq!(record["membershipType"], "basic");
    assert_eq!(record["createdAt"], "2025-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_created_record_keeps_requested_membership_type() {
    let (service, store) = fixtures::service_with_capacity(10);

    service
        .create(fixtures::reservation("a@x.com").with_membership_type("premium"))
        .await
        .unwrap();

    let record = store.get_by_path("reservations/1").await.unwrap().unwrap();
    assert_eq!(record["membershipType"], "premium");
}

#[tokio::test]
async fn test_counter_seeded_from_legacy_collection() {
    let store = InMemoryRecordStore::with_data(json!({
        "reservations": {
            "1": { "email": "old1@x.com" },
            "2": { "email": "old2@x.com" }
        }
    }));
    let (service, store) = fixtures::service_over(store, 10);

    let reserved = service.create(fixtures::reservation("new@x.com")).await.unwrap();

    assert_eq!(reserved, 3);
    assert_eq!(
        store.get_by_path("reservations/1").await.unwrap().unwrap()["email"],
        "old1@x.com"
    );
    assert_eq!(store.get_by_path("reservationCounter").await.unwrap(), Some(json!(3)));
}

#[tokio::test]
async fn test_lagging_counter_skips_occupied_keys() {
    let store = InMemoryRecordStore::with_data(json!({
        "reservationCounter": 1,
        "reservations": {
            "1": { "email": "old1@x.com" },
            "2": { "email": "old2@x.com" }
        }
    }));
    let (service, store) = fixtures::service_over(store, 10);

    let reserved = service.create(fixtures::reservation("new@x.com")).await.unwrap();

    assert_eq!(reserved, 3);
    assert_eq!(
        store.get_by_path("reservations/2").await.unwrap().unwrap()["email"],
        "old2@x.com"
    );
}

#[tokio::test]
async fn test_concurrent_creates_never_share_a_key() {
    let (service, store) = fixtures::service_with_capacity(50);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(fixtures::reservation(&format!("user{i}@x.com")))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let reserved = handle.await.unwrap().unwrap();
        assert!((1..=20).contains(&reserved));
    }

    let mut keys: Vec<u64> = store
        .get_all("reservations")
        .await
        .unwrap()
        .keys()
        .map(|key| key.parse().unwrap())
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, (1..=20).collect::<Vec<_>>());
    assert_eq!(store.get_by_path("reservationCounter").await.unwrap(), Some(json!(20)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_never_exceed_capacity() {
    let (service, store) = fixtures::service_with_capacity(5);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(fixtures::reservation(&format!("user{i}@x.com")))
                    .await
            })
        })
        .collect();

    let mut accepted = 0_u64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(err, ReservationError::CapacityExceeded)),
        }
    }

    let snapshot = service.capacity().await.unwrap();
    assert!(accepted <= 5);
    assert_eq!(snapshot.reserved_count, accepted);
    assert_eq!(
        u64::try_from(store.get_all("reservations").await.unwrap().len()).unwrap(),
        accepted
    );
}

#[tokio::test]
async fn test_create_store_failure() {
    let (service, store) = fixtures::service_with_capacity(10);
    store.set_unavailable(true);

    assert!(matches!(
        service.create(fixtures::reservation("a@x.com")).await,
        Err(ReservationError::Store(_))
    ));
}

#[tokio::test]
async fn test_failed_write_does_not_lose_a_spot() {
    let (service, store) = fixtures::service_with_capacity(2);
    store.fail_next_sets(1);

    assert!(matches!(
        service.create(fixtures::reservation("a@x.com")).await,
        Err(ReservationError::Store(StoreError::Unavailable(_)))
    ));
    let snapshot = service.capacity().await.unwrap();
    assert_eq!(snapshot.reserved_count, 0);
    assert_eq!(snapshot.available_spots, 2);

    assert_eq!(service.create(fixtures::reservation("a@x.com")).await.unwrap(), 1);
    assert_eq!(service.create(fixtures::reservation("b@x.com")).await.unwrap(), 2);

    let snapshot = service.capacity().await.unwrap();
    assert_eq!(snapshot.reserved_count, 2);
    assert_eq!(snapshot.available_spots, 0);
    assert!(matches!(
        service.create(fixtures::reservation("c@x.com")).await,
        Err(ReservationError::CapacityExceeded)
    ));

    // The dropped write only leaves a gap in the key sequence.
    let all = store.get_all("reservations").await.unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["2", "3"]);
}

/// In-memory store where another client writes `reservations/99` just
/// before the first record write lands.
struct RacingStore {
    inner: InMemoryRecordStore,
    raced: AtomicBool,
}

impl RecordStore for RacingStore {
    async fn get_all(&self, collection: &str) -> Result<Records, StoreError> {
        self.inner.get_all(collection).await
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get_by_path(path).await
    }

    async fn set_at_path(&self, path: &str, value: Value) -> Result<(), StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            self.inner
                .set_at_path("reservations/99", json!({ "email": "other@x.com" }))
                .await?;
        }
        self.inner.set_at_path(path, value).await
    }

    async fn update_at_path(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.inner.update_at_path(path, fields).await
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Records, StoreError> {
        self.inner.query_equal(collection, field, value).await
    }

    async fn increment_below(
        &self,
        path: &str,
        limit: u64,
        seed: u64,
    ) -> Result<Option<u64>, StoreError> {
        self.inner.increment_below(path, limit, seed).await
    }
}

#[tokio::test]
async fn test_create_losing_the_last_spot_rolls_back() {
    let store = Arc::new(RacingStore {
        inner: InMemoryRecordStore::new(),
        raced: AtomicBool::new(false),
    });
    let service = ReservationService::new(
        Arc::clone(&store),
        ReservationSettings::default().with_max_capacity(1),
        Arc::new(test_clock()),
    );

    let err = service
        .create(fixtures::reservation("a@x.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::CapacityExceeded));
    let all = store.get_all("reservations").await.unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["99"]);
    assert_eq!(service.capacity().await.unwrap().available_spots, 0);
}

// ============================================================================
// UpdateMembership / CheckUser
// ============================================================================

#[tokio::test]
async fn test_update_then_check_reflects_new_status() {
    let (service, _store) = fixtures::service_with_capacity(10);
    service.create(fixtures::reservation("a@x.com")).await.unwrap();

    let before = service.check_user("a@x.com").await.unwrap();
    assert_eq!(before.paid, MembershipPaid::NotPaid);

    service
        .update_membership(MembershipUpdate::new("a@x.com", MembershipPaid::Paid))
        .await
        .unwrap();

    let after = service.check_user("a@x.com").await.unwrap();
    assert_eq!(after.paid, MembershipPaid::Paid);
    assert_eq!(after.message(), "User found. Membership status: paid (basic).");
}

#[tokio::test]
async fn test_update_preserves_contact_fields() {
    let (service, store) = fixtures::service_with_capacity(10);
    service.create(fixtures::reservation("a@x.com")).await.unwrap();

    service
        .update_membership(
            MembershipUpdate::new("a@x.com", MembershipPaid::Paid).with_membership_type("gold"),
        )
        .await
        .unwrap();

    let record = store.get_by_path("reservations/1").await.unwrap().unwrap();
    assert_eq!(record["name"], "Test Person");
    assert_eq!(record["phone"], "555-0100");
    assert_eq!(record["sector"], "technology");
    assert_eq!(record["contactMethod"], "email");
    assert_eq!(record["message"], "Looking forward to it");
    assert_eq!(record["membershipPaid"], true);
    assert_eq!(record["membershipType"], "gold");
}

#[tokio::test]
async fn test_update_without_type_keeps_type() {
    let (service, store) = fixtures::service_with_capacity(10);
    service
        .create(fixtures::reservation("a@x.com").with_membership_type("premium"))
        .await
        .unwrap();

    service
        .update_membership(MembershipUpdate::new("a@x.com", MembershipPaid::Paid))
        .await
        .unwrap();

    let record = store.get_by_path("reservations/1").await.unwrap().unwrap();
    assert_eq!(record["membershipType"], "premium");
}

#[tokio::test]
async fn test_update_unknown_email_leaves_store_unchanged() {
    let (service, store) = fixtures::service_with_capacity(10);
    service.create(fixtures::reservation("a@x.com")).await.unwrap();
    let before = store.snapshot();

    let err = service
        .update_membership(MembershipUpdate::new("ghost@x.com", MembershipPaid::Paid))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::NotFound(_)));
    assert_eq!(err.to_string(), "User not found.");
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_update_requires_email_and_status() {
    let (service, _store) = fixtures::service_with_capacity(10);

    assert!(matches!(
        service
            .update_membership(MembershipUpdate::new("  ", MembershipPaid::Paid))
            .await,
        Err(ReservationError::Validation(_))
    ));

    let mut no_status = MembershipUpdate::new("a@x.com", MembershipPaid::Paid);
    no_status.membership_paid = None;
    assert!(matches!(
        service.update_membership(no_status).await,
        Err(ReservationError::Validation(_))
    ));
}

#[tokio::test]
async fn test_update_targets_first_numeric_key_among_duplicates() {
    let store = InMemoryRecordStore::with_data(json!({
        "reservations": {
            "10": { "email": "dup@x.com", "name": "Later" },
            "2": { "email": "dup@x.com", "name": "Earlier" }
        }
    }));
    let (service, store) = fixtures::service_over(store, 20);

    service
        .update_membership(MembershipUpdate::new("dup@x.com", MembershipPaid::Paid))
        .await
        .unwrap();

    assert_eq!(
        store.get_by_path("reservations/2/membershipPaid").await.unwrap(),
        Some(json!(true))
    );
    assert_eq!(
        store.get_by_path("reservations/10/membershipPaid").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_check_user_reads_legacy_string_flag() {
    let store = InMemoryRecordStore::with_data(json!({
        "reservations": {
            "1": { "email": "old@x.com", "membershipPaid": "yes", "membershipType": "gold" }
        }
    }));
    let (service, _store) = fixtures::service_over(store, 20);

    let summary = service.check_user("old@x.com").await.unwrap();

    assert_eq!(summary.paid, MembershipPaid::Paid);
    assert_eq!(summary.membership_type, "gold");
}

#[tokio::test]
async fn test_check_user_unknown_and_blank() {
    let (service, _store) = fixtures::service_with_capacity(10);

    assert!(matches!(
        service.check_user("ghost@x.com").await,
        Err(ReservationError::NotFound(_))
    ));
    assert!(matches!(
        service.check_user("").await,
        Err(ReservationError::Validation(_))
    ));
}

#[tokio::test]
async fn test_check_user_rejects_malformed_record() {
    let store = InMemoryRecordStore::with_data(json!({
        "reservations": { "1": { "email": "bad@x.com", "membershipPaid": 7 } }
    }));
    let (service, _store) = fixtures::service_over(store, 20);

    let err = service.check_user("bad@x.com").await.unwrap_err();

    assert!(matches!(err, ReservationError::Decode { ref key, .. } if key == "1"));
    assert!(!err.is_client_error());
}

// ============================================================================
// ListAll
// ============================================================================

#[tokio::test]
async fn test_list_all_empty_is_not_found() {
    let (service, _store) = fixtures::service_with_capacity(10);

    let err = service.list_all().await.unwrap_err();

    assert!(matches!(err, ReservationError::NotFound(_)));
    assert_eq!(err.to_string(), "No reservations found.");
}

#[tokio::test]
async fn test_list_all_returns_every_record() {
    let (service, _store) = fixtures::service_with_capacity(10);
    service.create(fixtures::reservation("a@x.com")).await.unwrap();
    service.create(fixtures::reservation("b@x.com")).await.unwrap();

    let all = service.list_all().await.unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(all["1"]["email"], "a@x.com");
    assert_eq!(all["2"]["email"], "b@x.com");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_available_spots_track_reservations(
        (capacity, emails) in (1_u64..20).prop_flat_map(|c| {
            (Just(c), properties::emails(0..usize::try_from(c).unwrap()))
        })
    ) {
        let (service, _store) = fixtures::service_with_capacity(capacity);

        futures::executor::block_on(async {
            for email in &emails {
                service.create(fixtures::reservation(email)).await.unwrap();
            }
            let snapshot = service.capacity().await.unwrap();
            let reserved = u64::try_from(emails.len()).unwrap();
            prop_assert_eq!(snapshot.reserved_count, reserved);
            prop_assert_eq!(snapshot.available_spots, capacity - reserved);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_repeated_email_always_duplicate(
        first in properties::reservation(),
        second in properties::reservation(),
    ) {
        let (service, _store) = fixtures::service_with_capacity(10);
        let repeat = NewReservation { email: first.email.clone(), ..second };

        futures::executor::block_on(async {
            service.create(first).await.unwrap();
            prop_assert!(matches!(
                service.create(repeat).await,
                Err(ReservationError::DuplicateEmail)
            ));
            Ok::<(), TestCaseError>(())
        })?;
    }
}
