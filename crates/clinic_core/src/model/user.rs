//! Identity model: users, role tags and registration credentials.
//!
//! # Responsibility
//! - Represent the authenticated principal's underlying account.
//! - Validate registration credential payloads before hashing.
//!
//! # Invariants
//! - `username` is unique, 1..=150 chars of letters, digits and `@.+-_`.
//! - `role` is fixed at registration and never changes afterwards.
//! - The credential hash is never serialized.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const USERNAME_MAX_CHARS: usize = 150;
const EMAIL_MAX_CHARS: usize = 254;

/// Stable identifier of a user account.
pub type UserId = Uuid;

/// Coarse role tag assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    /// Stable string id used in storage and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
        }
    }

    /// Parses the storage/API string form. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            _ => None,
        }
    }
}

/// Persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Empty when the user registered without an e-mail address.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// `None` for accounts provisioned outside registration.
    pub role: Option<Role>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public projection of a user embedded in profile payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Raw registration credentials as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewCredentials {
    /// Returns a trimmed copy after checking every field.
    ///
    /// The password is checked for presence only; strength policy belongs to
    /// the credential hasher supplied by the host.
    pub fn normalized(&self) -> Result<Self, CredentialError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(CredentialError::MissingUsername);
        }
        if username.chars().count() > USERNAME_MAX_CHARS || !USERNAME_RE.is_match(username) {
            return Err(CredentialError::InvalidUsername(username.to_string()));
        }

        let email = self.email.trim();
        if !email.is_empty()
            && (email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(email))
        {
            return Err(CredentialError::InvalidEmail(email.to_string()));
        }

        if self.password.is_empty() {
            return Err(CredentialError::MissingPassword);
        }

        Ok(Self {
            username: username.to_string(),
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

/// Registration credential validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    MissingUsername,
    InvalidUsername(String),
    InvalidEmail(String),
    MissingPassword,
    /// The host-supplied hasher rejected the password.
    Hashing(String),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUsername => write!(f, "username: this field is required"),
            Self::InvalidUsername(value) => write!(
                f,
                "username: `{value}` must be at most {USERNAME_MAX_CHARS} characters of letters, digits and @/./+/-/_"
            ),
            Self::InvalidEmail(value) => write!(f, "email: `{value}` is not a valid email address"),
            Self::MissingPassword => write!(f, "password: this field is required"),
            Self::Hashing(message) => write!(f, "password: {message}"),
        }
    }
}

impl Error for CredentialError {}

/// Password hashing seam supplied by the authentication collaborator.
pub trait CredentialHasher {
    /// Produces the stored credential hash for a plaintext password.
    fn hash_password(&self, password: &str) -> Result<String, CredentialError>;
}

#[cfg(test)]
mod tests {
    use super::{CredentialError, NewCredentials, Role};

    fn credentials(username: &str, email: &str, password: &str) -> NewCredentials {
        NewCredentials {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn role_parse_is_exact() {
        assert_eq!(Role::parse("doctor"), Some(Role::Doctor));
        assert_eq!(Role::parse("patient"), Some(Role::Patient));
        assert_eq!(Role::parse("Doctor"), None);
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn normalized_trims_username_and_email() {
        let normalized = credentials("  drA ", " a@clinic.test ", "pw")
            .normalized()
            .expect("valid credentials");
        assert_eq!(normalized.username, "drA");
        assert_eq!(normalized.email, "a@clinic.test");
    }

    #[test]
    fn normalized_allows_blank_email() {
        credentials("p1", "", "pw")
            .normalized()
            .expect("email is optional");
    }

    #[test]
    fn normalized_rejects_bad_fields() {
        assert_eq!(
            credentials(" ", "", "pw").normalized().unwrap_err(),
            CredentialError::MissingUsername
        );
        assert!(matches!(
            credentials("bad name", "", "pw").normalized().unwrap_err(),
            CredentialError::InvalidUsername(_)
        ));
        assert!(matches!(
            credentials("p1", "not-an-email", "pw").normalized().unwrap_err(),
            CredentialError::InvalidEmail(_)
        ));
        assert_eq!(
            credentials("p1", "", "").normalized().unwrap_err(),
            CredentialError::MissingPassword
        );
    }

    #[test]
    fn normalized_rejects_overlong_username() {
        let long = "u".repeat(151);
        assert!(matches!(
            credentials(&long, "", "pw").normalized().unwrap_err(),
            CredentialError::InvalidUsername(_)
        ));
    }
}
