//! Core domain logic for the clinic records backend.
//! This crate owns the access-control and relationship invariants; transports
//! call into its services and never touch storage directly.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod policy;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::profile::{
    DoctorId, DoctorListing, DoctorProfile, DoctorProfileUpdate, PatientId, PatientProfile,
    PatientProfileUpdate, ProfileValidationError,
};
pub use model::record::{
    DoctorNote, DoctorNoteId, HealthRecord, HealthRecordDetail, HealthRecordDraft, HealthRecordId,
    HealthRecordPatch, RecordValidationError,
};
pub use model::user::{
    CredentialError, CredentialHasher, NewCredentials, Role, User, UserId, UserSummary,
};
pub use notify::{AssignmentMessage, AssignmentNotice, AssignmentNotifier, LogNotifier, NotifyError};
pub use policy::Principal;
pub use repo::account_repo::{
    AccountProfile, AccountRepository, CreatedAccount, NewAccount, SqliteAccountRepository,
};
pub use repo::record_repo::{RecordRepository, SqliteRecordRepository};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::{AccountService, Registration, RegistrationRequest};
pub use service::record_service::RecordService;
pub use service::{ErrorKind, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
