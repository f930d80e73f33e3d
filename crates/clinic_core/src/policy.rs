//! Request principal and access policy.
//!
//! # Responsibility
//! - Resolve the authenticated user into a role-specific `Principal` once per
//!   request.
//! - Decide which profiles and records a principal may read or annotate.
//!
//! # Invariants
//! - Patients see exactly their own records.
//! - Doctors see the union of records of their assigned patients.
//! - Unknown principals see nothing.
//! - Only an assigned doctor may add notes to a record.

use crate::model::profile::{DoctorProfile, PatientProfile};
use crate::model::record::HealthRecord;
use crate::model::user::{Role, UserId};
use crate::repo::account_repo::AccountRepository;
use crate::repo::record_repo::RecordRepository;
use crate::repo::RepoResult;

/// Authenticated identity making a request, resolved to its role profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
    /// Authenticated user without a usable role profile.
    Unknown(UserId),
}

impl Principal {
    /// Resolves a user id to a principal.
    ///
    /// Returns `None` when the user does not exist. A role tag without the
    /// matching profile resolves to `Unknown`.
    pub fn resolve<A: AccountRepository>(
        accounts: &A,
        user_id: UserId,
    ) -> RepoResult<Option<Self>> {
        let Some(user) = accounts.get_user(user_id)? else {
            return Ok(None);
        };

        let principal = match user.role {
            Some(Role::Doctor) => accounts
                .find_doctor_by_user(user_id)?
                .map_or(Self::Unknown(user_id), Self::Doctor),
            Some(Role::Patient) => accounts
                .find_patient_by_user(user_id)?
                .map_or(Self::Unknown(user_id), Self::Patient),
            None => Self::Unknown(user_id),
        };
        Ok(Some(principal))
    }

    pub fn user_id(&self) -> UserId {
        match self {
            Self::Patient(patient) => patient.user.id,
            Self::Doctor(doctor) => doctor.user.id,
            Self::Unknown(user_id) => *user_id,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Patient(_) => Some(Role::Patient),
            Self::Doctor(_) => Some(Role::Doctor),
            Self::Unknown(_) => None,
        }
    }

    /// `doctor`, `patient` or `unknown`.
    pub fn role_label(&self) -> &'static str {
        self.role().map_or("unknown", Role::as_str)
    }

    pub fn as_patient(&self) -> Option<&PatientProfile> {
        match self {
            Self::Patient(patient) => Some(patient),
            _ => None,
        }
    }

    pub fn as_doctor(&self) -> Option<&DoctorProfile> {
        match self {
            Self::Doctor(doctor) => Some(doctor),
            _ => None,
        }
    }
}

pub fn can_access_patient_profile(principal: &Principal, patient: &PatientProfile) -> bool {
    principal.user_id() == patient.user.id
}

pub fn can_access_doctor_profile(principal: &Principal, doctor: &DoctorProfile) -> bool {
    principal.user_id() == doctor.user.id
}

/// Returns every record the principal may read.
pub fn visible_health_records<R: RecordRepository>(
    principal: &Principal,
    records: &R,
) -> RepoResult<Vec<HealthRecord>> {
    match principal {
        Principal::Patient(patient) => records.list_records_for_patient(patient.id),
        Principal::Doctor(doctor) => records.list_records_for_doctor(doctor.id),
        Principal::Unknown(_) => Ok(Vec::new()),
    }
}

/// Single-record form of [`visible_health_records`].
pub fn can_view_health_record<A: AccountRepository>(
    principal: &Principal,
    record: &HealthRecord,
    accounts: &A,
) -> RepoResult<bool> {
    match principal {
        Principal::Patient(patient) => Ok(record.patient_id == patient.id),
        Principal::Doctor(doctor) => accounts.is_assigned(doctor.id, record.patient_id),
        Principal::Unknown(_) => Ok(false),
    }
}

pub fn can_add_note<A: AccountRepository>(
    principal: &Principal,
    record: &HealthRecord,
    accounts: &A,
) -> RepoResult<bool> {
    match principal {
        Principal::Doctor(doctor) => accounts.is_assigned(doctor.id, record.patient_id),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::{can_access_doctor_profile, can_access_patient_profile, Principal};
    use crate::model::profile::{DoctorProfile, PatientProfile};
    use crate::model::user::{Role, UserSummary};
    use uuid::Uuid;

    fn summary(username: &str) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: String::new(),
        }
    }

    fn patient(username: &str) -> PatientProfile {
        PatientProfile {
            id: Uuid::new_v4(),
            user: summary(username),
            date_of_birth: None,
            phone_number: String::new(),
            address: String::new(),
        }
    }

    fn doctor(username: &str) -> DoctorProfile {
        DoctorProfile {
            id: Uuid::new_v4(),
            user: summary(username),
            specialization: String::new(),
            license_number: String::new(),
        }
    }

    #[test]
    fn profile_access_is_owner_only() {
        let p1 = patient("p1");
        let p2 = patient("p2");
        let dr_a = doctor("drA");

        let as_p1 = Principal::Patient(p1.clone());
        assert!(can_access_patient_profile(&as_p1, &p1));
        assert!(!can_access_patient_profile(&as_p1, &p2));
        assert!(!can_access_doctor_profile(&as_p1, &dr_a));

        let as_dr_a = Principal::Doctor(dr_a.clone());
        assert!(can_access_doctor_profile(&as_dr_a, &dr_a));
        assert!(!can_access_patient_profile(&as_dr_a, &p1));
    }

    #[test]
    fn role_labels_cover_all_variants() {
        assert_eq!(Principal::Patient(patient("p1")).role_label(), "patient");
        assert_eq!(Principal::Doctor(doctor("drA")).role_label(), "doctor");
        let unknown = Principal::Unknown(Uuid::new_v4());
        assert_eq!(unknown.role_label(), "unknown");
        assert_eq!(unknown.role(), None);
        assert_eq!(Principal::Doctor(doctor("drA")).role(), Some(Role::Doctor));
    }
}
