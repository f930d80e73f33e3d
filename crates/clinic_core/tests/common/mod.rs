#![allow(dead_code)]

use clinic_core::{
    AccountService, AssignmentNotice, AssignmentNotifier, CredentialError, CredentialHasher,
    DoctorId, NewCredentials, NotifyError, Principal, RecordService, Registration,
    RegistrationRequest, Role, SqliteAccountRepository, SqliteRecordRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Deterministic hasher; real hashing is the host's concern.
pub struct PrefixHasher;

impl CredentialHasher for PrefixHasher {
    fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        Ok(format!("test${password}"))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<AssignmentNotice>>,
    pub fail: bool,
    pub panics: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            fail: true,
            panics: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            fail: false,
            panics: true,
        }
    }

    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl AssignmentNotifier for RecordingNotifier {
    fn patient_assigned(&self, notice: &AssignmentNotice) -> Result<(), NotifyError> {
        self.notices.lock().unwrap().push(notice.clone());
        if self.panics {
            panic!("mail relay crashed");
        }
        if self.fail {
            return Err(NotifyError::Delivery("smtp unavailable".to_string()));
        }
        Ok(())
    }
}

pub fn account_service<'c>(
    conn: &'c Connection,
    notifier: &Arc<RecordingNotifier>,
) -> AccountService<SqliteAccountRepository<'c>> {
    let notifier: Arc<dyn AssignmentNotifier> = notifier.clone();
    AccountService::new(SqliteAccountRepository::try_new(conn).unwrap(), notifier)
}

pub fn record_service(
    conn: &Connection,
) -> RecordService<SqliteAccountRepository<'_>, SqliteRecordRepository<'_>> {
    RecordService::new(
        SqliteAccountRepository::try_new(conn).unwrap(),
        SqliteRecordRepository::try_new(conn).unwrap(),
    )
}

pub fn request(username: &str, role: Role, doctor_id: Option<DoctorId>) -> RegistrationRequest {
    RegistrationRequest {
        credentials: NewCredentials {
            username: username.to_string(),
            email: format!("{}@clinic.test", username.to_lowercase()),
            password: "s3cret".to_string(),
        },
        role,
        doctor_id,
    }
}

pub fn register_doctor(
    service: &AccountService<SqliteAccountRepository<'_>>,
    username: &str,
) -> (Registration, Principal) {
    let registration = service
        .register(&request(username, Role::Doctor, None), &PrefixHasher)
        .unwrap();
    let principal = service
        .resolve_principal(registration.user.id)
        .unwrap()
        .unwrap();
    (registration, principal)
}

pub fn register_patient(
    service: &AccountService<SqliteAccountRepository<'_>>,
    username: &str,
    doctor: &Principal,
) -> (Registration, Principal) {
    let doctor_id = doctor.as_doctor().expect("doctor principal").id;
    let registration = service
        .register(&request(username, Role::Patient, Some(doctor_id)), &PrefixHasher)
        .unwrap();
    let principal = service
        .resolve_principal(registration.user.id)
        .unwrap()
        .unwrap();
    (registration, principal)
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}
