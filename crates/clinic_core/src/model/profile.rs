//! Patient and doctor profiles.
//!
//! # Responsibility
//! - Define the role profiles attached one-to-one to a user.
//! - Validate profile updates before persistence.
//!
//! # Invariants
//! - `user.id` is unique per profile table and never shared across tables.
//! - `date_of_birth`, when set, is a calendar date in `YYYY-MM-DD` form.

use crate::model::user::UserSummary;
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DATE_OF_BIRTH_FORMAT: &str = "%Y-%m-%d";

const PHONE_MAX_CHARS: usize = 15;
const SPECIALIZATION_MAX_CHARS: usize = 100;
const LICENSE_NUMBER_MAX_CHARS: usize = 50;

pub type PatientId = Uuid;
pub type DoctorId = Uuid;

/// Patient profile with its owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientProfile {
    pub id: PatientId,
    pub user: UserSummary,
    /// Serialized as `YYYY-MM-DD`.
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: String,
    pub address: String,
}

/// Doctor profile with its owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorProfile {
    pub id: DoctorId,
    pub user: UserSummary,
    pub specialization: String,
    pub license_number: String,
}

/// Public doctor directory entry used during patient self-registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorListing {
    pub id: DoctorId,
    pub username: String,
    pub email: String,
}

/// Partial update of patient-owned profile fields.
///
/// `None` leaves a field untouched; `date_of_birth: Some(None)` clears it.
/// A date that is not a `YYYY-MM-DD` calendar date fails deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PatientProfileUpdate {
    #[serde(default, deserialize_with = "deserialize_date_of_birth")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl PatientProfileUpdate {
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if let Some(phone) = &self.phone_number {
            check_len("phone_number", phone, PHONE_MAX_CHARS)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.date_of_birth.is_none() && self.phone_number.is_none() && self.address.is_none()
    }
}

/// Partial update of doctor-owned profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DoctorProfileUpdate {
    pub specialization: Option<String>,
    pub license_number: Option<String>,
}

impl DoctorProfileUpdate {
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if let Some(value) = &self.specialization {
            check_len("specialization", value, SPECIALIZATION_MAX_CHARS)?;
        }
        if let Some(value) = &self.license_number {
            check_len("license_number", value, LICENSE_NUMBER_MAX_CHARS)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.specialization.is_none() && self.license_number.is_none()
    }
}

/// Profile field validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    InvalidDate(String),
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
}

impl Display for ProfileValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(value) => {
                write!(f, "date_of_birth: `{value}` is not a valid YYYY-MM-DD date")
            }
            Self::TooLong { field, max_chars } => {
                write!(f, "{field}: ensure this field has no more than {max_chars} characters")
            }
        }
    }
}

impl Error for ProfileValidationError {}

fn check_len(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ProfileValidationError> {
    if value.chars().count() > max_chars {
        return Err(ProfileValidationError::TooLong { field, max_chars });
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` date of birth.
pub fn parse_date_of_birth(value: &str) -> Result<NaiveDate, ProfileValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_OF_BIRTH_FORMAT)
        .map_err(|_| ProfileValidationError::InvalidDate(value.to_string()))
}

// Distinguishes an explicit `null` (clear) from an absent key (keep).
fn deserialize_date_of_birth<'de, D>(
    deserializer: D,
) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_date_of_birth(&raw)
            .map(|date| Some(Some(date)))
            .map_err(D::Error::custom),
        None => Ok(Some(None)),
    }
}
