//! Reservation domain types.
//!
//! Field names are camelCase on the wire and in storage, matching the JSON
//! documents already present in the database.

use crate::error::ReservationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Membership type given to reservations that do not name one.
pub const DEFAULT_MEMBERSHIP_TYPE: &str = "basic";

// ============================================================================
// Membership status
// ============================================================================

/// Whether a reservation's membership fee has been paid.
///
/// Stored as a JSON boolean. Older documents carry `"yes"`/`"no"` strings,
/// so deserialization accepts a boolean or any string its `FromStr`
/// implementation understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MembershipPaid {
    /// Fee paid.
    Paid,
    /// Fee not paid.
    #[default]
    NotPaid,
}

impl MembershipPaid {
    /// Returns `true` for [`MembershipPaid::Paid`].
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }

    /// Human readable label used in responses.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::NotPaid => "not paid",
        }
    }
}

impl From<bool> for MembershipPaid {
    fn from(paid: bool) -> Self {
        if paid { Self::Paid } else { Self::NotPaid }
    }
}

impl fmt::Display for MembershipPaid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string is not a recognised paid flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised membership status '{0}'")]
pub struct ParseMembershipPaidError(String);

impl FromStr for MembershipPaid {
    type Err = ParseMembershipPaidError;

    /// Accepts `yes`, `true`, `paid` and `no`, `false`, `not paid`
    /// (case-insensitive, surrounding whitespace ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "paid" => Ok(Self::Paid),
            "no" | "false" | "not paid" => Ok(Self::NotPaid),
            _ => Err(ParseMembershipPaidError(s.to_string())),
        }
    }
}

impl Serialize for MembershipPaid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_paid())
    }
}

impl<'de> Deserialize<'de> for MembershipPaid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(paid) => Ok(Self::from(paid)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// Stored record
// ============================================================================

/// A reservation document as stored in the `reservations` collection.
///
/// Every field has a default so partially written legacy documents still
/// decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reservation {
    /// Full name
    pub name: String,
    /// Contact email, unique across reservations
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Business sector
    pub sector: String,
    /// Preferred contact method
    pub contact_method: String,
    /// Free-form message
    pub message: String,
    /// Membership fee status
    pub membership_paid: MembershipPaid,
    /// Membership tier
    pub membership_type: String,
    /// Insert time; absent on documents written before it was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for Reservation {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            sector: String::new(),
            contact_method: String::new(),
            message: String::new(),
            membership_paid: MembershipPaid::NotPaid,
            membership_type: DEFAULT_MEMBERSHIP_TYPE.to_string(),
            created_at: None,
        }
    }
}

/// Defaults applied to optional reservation fields on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDefaults {
    /// Paid flag when the request does not carry one
    pub membership_paid: MembershipPaid,
    /// Membership tier when the request does not carry one
    pub membership_type: String,
}

impl Default for ReservationDefaults {
    fn default() -> Self {
        Self {
            membership_paid: MembershipPaid::NotPaid,
            membership_type: DEFAULT_MEMBERSHIP_TYPE.to_string(),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Request to claim a spot.
///
/// Missing and `null` fields deserialize to empty strings so validation can
/// report them uniformly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewReservation {
    /// Full name
    #[serde(deserialize_with = "nullable_string")]
    pub name: String,
    /// Contact email
    #[serde(deserialize_with = "nullable_string")]
    pub email: String,
    /// Phone number
    #[serde(deserialize_with = "nullable_string")]
    pub phone: String,
    /// Business sector
    #[serde(deserialize_with = "nullable_string")]
    pub sector: String,
    /// Preferred contact method
    #[serde(deserialize_with = "nullable_string")]
    pub contact_method: String,
    /// Free-form message
    #[serde(deserialize_with = "nullable_string")]
    pub message: String,
    /// Optional membership tier
    pub membership_type: Option<String>,
    /// Optional initial paid flag
    pub membership_paid: Option<MembershipPaid>,
}

impl NewReservation {
    /// Build a request from the six required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        sector: impl Into<String>,
        contact_method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            sector: sector.into(),
            contact_method: contact_method.into(),
            message: message.into(),
            membership_type: None,
            membership_paid: None,
        }
    }

    /// Set the membership tier.
    #[must_use]
    pub fn with_membership_type(mut self, membership_type: impl Into<String>) -> Self {
        self.membership_type = Some(membership_type.into());
        self
    }

    /// Check that every required field is present and not blank.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] when any required field is
    /// blank. The missing field names are logged at debug level.
    pub fn validate(&self) -> Result<(), ReservationError> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("sector", &self.sector),
            ("contactMethod", &self.contact_method),
            ("message", &self.message),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            tracing::debug!(?missing, "Reservation request is missing fields");
            Err(ReservationError::all_fields_required())
        }
    }

    /// Turn the request into a stored record, filling optional fields.
    #[must_use]
    pub fn into_reservation(
        self,
        defaults: &ReservationDefaults,
        created_at: DateTime<Utc>,
    ) -> Reservation {
        let membership_type = self
            .membership_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| defaults.membership_type.clone());

        Reservation {
            name: self.name,
            email: self.email.trim().to_string(),
            phone: self.phone,
            sector: self.sector,
            contact_method: self.contact_method,
            message: self.message,
            membership_paid: self.membership_paid.unwrap_or(defaults.membership_paid),
            membership_type,
            created_at: Some(created_at),
        }
    }
}

/// Request to change the membership fields of an existing reservation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MembershipUpdate {
    /// Email identifying the reservation
    #[serde(deserialize_with = "nullable_string")]
    pub email: String,
    /// New paid flag
    pub membership_paid: Option<MembershipPaid>,
    /// New membership tier; left unchanged when absent
    pub membership_type: Option<String>,
}

impl MembershipUpdate {
    /// Build an update.
    #[must_use]
    pub fn new(email: impl Into<String>, membership_paid: MembershipPaid) -> Self {
        Self {
            email: email.into(),
            membership_paid: Some(membership_paid),
            membership_type: None,
        }
    }

    /// Also change the membership tier.
    #[must_use]
    pub fn with_membership_type(mut self, membership_type: impl Into<String>) -> Self {
        self.membership_type = Some(membership_type.into());
        self
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    /// Reservations currently stored
    pub reserved_count: u64,
    /// Spots left, never negative
    pub available_spots: u64,
    /// Configured maximum
    pub max_capacity: u64,
}

impl CapacitySnapshot {
    /// Compute the snapshot for `reserved_count` out of `max_capacity`.
    #[must_use]
    pub const fn new(reserved_count: u64, max_capacity: u64) -> Self {
        Self {
            reserved_count,
            available_spots: max_capacity.saturating_sub(reserved_count),
            max_capacity,
        }
    }

    /// `true` when no spot is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.available_spots == 0
    }
}

/// Membership status of a located reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSummary {
    /// Email that was looked up
    pub email: String,
    /// Paid flag
    pub paid: MembershipPaid,
    /// Membership tier
    pub membership_type: String,
}

impl MembershipSummary {
    /// Client facing status line.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "User found. Membership status: {} ({}).",
            self.paid, self.membership_type
        )
    }
}
