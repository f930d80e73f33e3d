//! Core use-case services.
//!
//! # Responsibility
//! - Combine repositories and the access policy into request-level operations.
//! - Translate every failure into a `ServiceError` with an explicit kind.
//!
//! # Invariants
//! - Out-of-scope entities are reported as `NotFound`, never as `Authorization`,
//!   unless the caller can already see the entity.
//! - Storage faults never leak as raw SQLite errors; they are `Infrastructure`.

use crate::model::profile::ProfileValidationError;
use crate::model::record::RecordValidationError;
use crate::model::user::CredentialError;
use crate::repo::RepoError;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account_service;
pub mod record_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

const CONFLICT_MESSAGE: &str = "Request conflicts with existing data";

/// Error category exposed at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Infrastructure => "infrastructure",
        }
    }
}

/// Structured failure returned by every service operation.
#[derive(Debug)]
pub enum ServiceError {
    /// Malformed or missing input.
    Validation(String),
    /// Entity absent or outside the caller's scope.
    NotFound(String),
    /// Authenticated, but the role or ownership is insufficient.
    Authorization(String),
    /// Storage or internal fault.
    Infrastructure(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Caller-facing message. Infrastructure details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Authorization(message) => message.clone(),
            Self::Infrastructure(_) => "Internal server error".to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation error: {message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Authorization(message) => write!(f, "authorization error: {message}"),
            Self::Infrastructure(err) => write!(f, "infrastructure error: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Infrastructure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, .. } => Self::NotFound(format!("{entity} not found")),
            RepoError::Conflict(detail) => {
                warn!(
                    "event=service_conflict module=service status=rejected detail={}",
                    detail
                );
                Self::Validation(CONFLICT_MESSAGE.to_string())
            }
            other => {
                error!(
                    "event=service_fault module=service status=error error={}",
                    other
                );
                Self::Infrastructure(other)
            }
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<ProfileValidationError> for ServiceError {
    fn from(value: ProfileValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<RecordValidationError> for ServiceError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_to_service_kinds() {
        let not_found: ServiceError = RepoError::NotFound {
            entity: "doctor",
            id: Uuid::nil(),
        }
        .into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.public_message(), "doctor not found");

        let conflict: ServiceError = RepoError::Conflict(
            "UNIQUE constraint failed: doctors.license_number".to_string(),
        )
        .into();
        assert_eq!(conflict.kind(), ErrorKind::Validation);
        let message = conflict.public_message();
        assert!(!message.contains("constraint"), "{message}");
        assert!(!message.contains("doctors."), "{message}");

        let fault: ServiceError = RepoError::InvalidData("bad row".to_string()).into();
        assert_eq!(fault.kind(), ErrorKind::Infrastructure);
        assert_eq!(fault.public_message(), "Internal server error");
    }
}
