//! Reservation business rules.
//!
//! # Key allocation
//!
//! Reservation keys are sequential integers. They are handed out by an
//! atomic counter in the store ([`RecordStore::increment_below`]) rather
//! than derived from a read of the collection size, so two concurrent
//! creates never receive the same key. The counter only issues keys; a
//! failed write leaves a gap in the numbering and nothing else.
//!
//! Capacity is enforced on the collection itself: once before the write and
//! again after it. A create whose record pushes the collection past
//! `max_capacity` deletes that record and reports `CapacityExceeded`, so
//! racing creates for the last spot may both be turned away but the
//! collection never ends up over capacity.
//!
//! ```text
//! validate ─▶ email taken? ─▶ count ≥ max? ─▶ claim key n ─▶ write collection/n ─▶ count > max?
//!     │             │               │                                                │
//!  Validation  DuplicateEmail  CapacityExceeded                          delete n, CapacityExceeded
//! ```
//!
//! Email uniqueness is still a query before the write; two simultaneous
//! creates for the same email can both pass it.

use crate::environment::Clock;
use crate::error::{MSG_MEMBERSHIP_STATUS_REQUIRED, MSG_NO_RESERVATIONS, ReservationError, Result};
use crate::reservation::{
    CapacitySnapshot, MembershipSummary, MembershipUpdate, NewReservation, Reservation,
    ReservationDefaults,
};
use crate::store::{RecordStore, Records, child_path, first_key};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field used to look reservations up.
const EMAIL_FIELD: &str = "email";

/// Tunables of the reservation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSettings {
    /// Maximum number of reservations; 0 closes bookings
    pub max_capacity: u64,
    /// Collection holding reservation documents
    pub collection: String,
    /// Path of the key counter
    pub counter_path: String,
    /// Defaults for optional fields
    pub defaults: ReservationDefaults,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self {
            max_capacity: 300,
            collection: "reservations".to_string(),
            counter_path: "reservationCounter".to_string(),
            defaults: ReservationDefaults::default(),
        }
    }
}

impl ReservationSettings {
    /// Override the capacity.
    #[must_use]
    pub const fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Reservation service over an injected record store and clock.
pub struct ReservationService<S> {
    store: Arc<S>,
    settings: ReservationSettings,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for ReservationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: RecordStore> ReservationService<S> {
    /// Create a new service.
    #[must_use]
    pub fn new(store: Arc<S>, settings: ReservationSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            settings,
            clock,
        }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &ReservationSettings {
        &self.settings
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current occupancy.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Store`] when the collection cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn capacity(&self) -> Result<CapacitySnapshot> {
        let reserved = self.reserved_count().await?;
        Ok(CapacitySnapshot::new(reserved, self.settings.max_capacity))
    }

    /// Claim a spot. Returns the new reservation count.
    ///
    /// # Errors
    ///
    /// - `Validation`: a required field is blank
    /// - `DuplicateEmail`: the email already holds a reservation
    /// - `CapacityExceeded`: no spot left
    /// - `Store`/`Encode`: backend failure
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(&self, request: NewReservation) -> Result<u64> {
        request.validate()?;

        let email = request.email.trim().to_string();
        if !self.find_by_email(&email).await?.is_empty() {
            tracing::info!(%email, "Email already holds a reservation");
            return Err(ReservationError::DuplicateEmail);
        }

        let count = self.reserved_count().await?;
        if count >= self.settings.max_capacity {
            tracing::info!(count, max = self.settings.max_capacity, "Capacity reached");
            return Err(ReservationError::CapacityExceeded);
        }

        let record = request.into_reservation(&self.settings.defaults, self.clock.now());
        let document = serde_json::to_value(&record).map_err(ReservationError::Encode)?;

        let key = self.claim_key(count).await?;
        let path = child_path(&self.settings.collection, key);
        self.store.set_at_path(&path, document).await?;

        let reserved = self.reserved_count().await?;
        if reserved > self.settings.max_capacity {
            tracing::warn!(
                key,
                reserved,
                max = self.settings.max_capacity,
                "Concurrent create filled the last spot, rolling back"
            );
            self.store.set_at_path(&path, Value::Null).await?;
            return Err(ReservationError::CapacityExceeded);
        }

        tracing::info!(
            key,
            reserved,
            name = %record.name,
            email = %record.email,
            sector = %record.sector,
            contact_method = %record.contact_method,
            "Spot reserved"
        );
        Ok(reserved)
    }

    /// Merge new membership fields into the reservation for `update.email`.
    ///
    /// Only `membershipPaid` and, when given, `membershipType` change; the
    /// contact fields of the record are preserved. When several records
    /// share the email the first key wins.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank email or missing paid flag
    /// - `NotFound`: no reservation for the email (nothing is written)
    /// - `Store`: backend failure
    #[tracing::instrument(skip(self, update), fields(email = %update.email))]
    pub async fn update_membership(&self, update: MembershipUpdate) -> Result<()> {
        let email = update.email.trim();
        if email.is_empty() {
            return Err(ReservationError::email_required());
        }
        let Some(paid) = update.membership_paid else {
            return Err(ReservationError::Validation(
                MSG_MEMBERSHIP_STATUS_REQUIRED.to_string(),
            ));
        };

        let matches = self.find_by_email(email).await?;
        let Some(key) = first_key(&matches) else {
            return Err(ReservationError::user_not_found());
        };
        if matches.len() > 1 {
            tracing::warn!(%email, hits = matches.len(), %key, "Several reservations share an email");
        }

        let mut fields = Map::new();
        fields.insert("membershipPaid".to_string(), Value::Bool(paid.is_paid()));
        if let Some(membership_type) = update.membership_type.filter(|t| !t.trim().is_empty()) {
            fields.insert("membershipType".to_string(), Value::String(membership_type));
        }

        self.store
            .update_at_path(&child_path(&self.settings.collection, key), fields)
            .await?;

        tracing::info!(%email, %key, %paid, "Membership updated");
        Ok(())
    }

    /// Membership status for `email`.
    ///
    /// Paid when any record with the email is paid; the membership type is
    /// taken from the first record.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank email
    /// - `NotFound`: no reservation for the email
    /// - `Decode`/`Store`: backend failure
    #[tracing::instrument(skip(self))]
    pub async fn check_user(&self, email: &str) -> Result<MembershipSummary> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ReservationError::email_required());
        }

        let matches = self.find_by_email(email).await?;
        let Some(first) = first_key(&matches) else {
            return Err(ReservationError::user_not_found());
        };

        let mut paid = false;
        let mut membership_type = None;
        for (key, document) in &matches {
            let record: Reservation = serde_json::from_value(document.clone()).map_err(
                |source| ReservationError::Decode {
                    key: key.clone(),
                    source,
                },
            )?;
            paid |= record.membership_paid.is_paid();
            if key == first {
                membership_type = Some(record.membership_type);
            }
        }

        Ok(MembershipSummary {
            email: email.to_string(),
            paid: paid.into(),
            membership_type: membership_type
                .unwrap_or_else(|| self.settings.defaults.membership_type.clone()),
        })
    }

    /// Every stored reservation document.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the collection is empty
    /// - `Store`: backend failure
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Records> {
        let records = self.store.get_all(&self.settings.collection).await?;
        if records.is_empty() {
            return Err(ReservationError::NotFound(MSG_NO_RESERVATIONS.to_string()));
        }
        Ok(records)
    }

    async fn reserved_count(&self) -> Result<u64> {
        let records = self.store.get_all(&self.settings.collection).await?;
        Ok(u64::try_from(records.len()).unwrap_or(u64::MAX))
    }

    async fn find_by_email(&self, email: &str) -> Result<Records> {
        let hits = self
            .store
            .query_equal(
                &self.settings.collection,
                EMAIL_FIELD,
                &Value::String(email.to_string()),
            )
            .await?;
        Ok(hits)
    }

    /// Claim the next free key from the counter.
    ///
    /// A counter lagging behind the collection (documents written by an
    /// older deployment) hands out occupied keys; those are skipped.
    async fn claim_key(&self, seed: u64) -> Result<u64> {
        let collection = &self.settings.collection;
        loop {
            let Some(key) = self
                .store
                .increment_below(&self.settings.counter_path, u64::MAX, seed)
                .await?
            else {
                return Err(ReservationError::CapacityExceeded);
            };

            if self
                .store
                .get_by_path(&child_path(collection, key))
                .await?
                .is_none()
            {
                return Ok(key);
            }
            tracing::warn!(key, "Counter handed out an occupied key, skipping");
        }
    }
}
