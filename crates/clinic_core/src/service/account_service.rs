//! Account, profile and assignment use-cases.
//!
//! # Responsibility
//! - Register patients and doctors with their role profile.
//! - Resolve request principals and roles.
//! - Serve the public doctor directory and the doctor's patient list.
//! - Own profile read/update/delete under owner-only access.
//!
//! # Invariants
//! - Patient registration requires an existing doctor; nothing is persisted
//!   when any step fails.
//! - The notifier runs once per newly created assignment, after commit, and
//!   its failure never fails the operation.

use crate::model::profile::{
    DoctorId, DoctorListing, DoctorProfile, DoctorProfileUpdate, PatientId, PatientProfile,
    PatientProfileUpdate,
};
use crate::model::user::{CredentialHasher, NewCredentials, Role, UserId, UserSummary};
use crate::notify::{deliver_best_effort, AssignmentNotice, AssignmentNotifier};
use crate::policy::{can_access_doctor_profile, can_access_patient_profile, Principal};
use crate::repo::account_repo::{AccountProfile, AccountRepository, NewAccount};
use crate::repo::RepoError;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

const DOCTOR_REQUIRED: &str = "Doctor selection is required for patient registration";
const DOCTOR_NOT_FOUND: &str = "Selected doctor not found";
const USERNAME_TAKEN: &str = "username: a user with that username already exists";
const PATIENT_NOT_FOUND: &str = "patient not found";
const DOCTOR_PROFILE_NOT_FOUND: &str = "doctor not found";

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub credentials: NewCredentials,
    pub role: Role,
    /// Required when `role == Role::Patient`.
    pub doctor_id: Option<DoctorId>,
}

/// Registration outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user: UserSummary,
    pub role: Role,
    pub profile: AccountProfile,
    /// Username of the doctor a new patient was assigned to.
    pub doctor: Option<String>,
}

/// Account use-case service.
pub struct AccountService<A: AccountRepository> {
    repo: A,
    notifier: Arc<dyn AssignmentNotifier>,
}

impl<A: AccountRepository> AccountService<A> {
    pub fn new(repo: A, notifier: Arc<dyn AssignmentNotifier>) -> Self {
        Self { repo, notifier }
    }

    /// Registers a user with its role profile.
    ///
    /// # Errors
    /// - `Validation` for bad credentials, a missing or unknown `doctor_id`,
    ///   or a taken username.
    pub fn register(
        &self,
        request: &RegistrationRequest,
        hasher: &dyn CredentialHasher,
    ) -> ServiceResult<Registration> {
        let started_at = Instant::now();
        let credentials = request.credentials.normalized()?;

        let doctor_id = match (request.role, request.doctor_id) {
            (Role::Patient, None) => return Err(ServiceError::Validation(DOCTOR_REQUIRED.into())),
            (Role::Patient, Some(doctor_id)) => Some(doctor_id),
            (Role::Doctor, _) => None,
        };

        let password_hash = hasher.hash_password(&credentials.password)?;
        let account = NewAccount {
            username: credentials.username,
            email: credentials.email,
            password_hash,
            role: request.role,
            doctor_id,
        };

        let created = match self.repo.create_account(&account) {
            Ok(created) => created,
            Err(RepoError::NotFound { entity: "doctor", .. }) => {
                return Err(ServiceError::Validation(DOCTOR_NOT_FOUND.into()));
            }
            Err(RepoError::Conflict(message)) if message.contains("users.username") => {
                return Err(ServiceError::Validation(USERNAME_TAKEN.into()));
            }
            Err(err) => {
                warn!(
                    "event=register module=account_service status=error role={} duration_ms={} error={}",
                    request.role.as_str(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        if let (AccountProfile::Patient(patient), Some(doctor)) =
            (&created.profile, &created.assigned_doctor)
        {
            self.notify_assignment(doctor, patient);
        }

        info!(
            "event=register module=account_service status=ok role={} user_id={} assigned={} duration_ms={}",
            request.role.as_str(),
            created.user.id,
            created.assigned_doctor.is_some(),
            started_at.elapsed().as_millis()
        );

        Ok(Registration {
            user: created.user.summary(),
            role: request.role,
            doctor: created
                .assigned_doctor
                .as_ref()
                .map(|doctor| doctor.user.username.clone()),
            profile: created.profile,
        })
    }

    /// Resolves the authenticated user into a principal.
    ///
    /// Returns `None` when the user id is unknown to storage.
    pub fn resolve_principal(&self, user_id: UserId) -> ServiceResult<Option<Principal>> {
        Ok(Principal::resolve(&self.repo, user_id)?)
    }

    /// Returns `doctor`, `patient` or `unknown`.
    pub fn resolve_role(&self, principal: &Principal) -> &'static str {
        principal.role_label()
    }

    /// Public doctor directory; needs no authentication.
    pub fn list_available_doctors(&self) -> ServiceResult<Vec<DoctorListing>> {
        Ok(self.repo.list_directory_doctors()?)
    }

    /// Lists the calling doctor's assigned patients.
    pub fn list_assigned_patients(
        &self,
        principal: &Principal,
    ) -> ServiceResult<Vec<PatientProfile>> {
        let doctor = principal.as_doctor().ok_or_else(|| {
            ServiceError::Authorization("Only doctors can list assigned patients".into())
        })?;
        Ok(self.repo.list_assigned_patients(doctor.id)?)
    }

    /// Adds a patient to a doctor's assigned set.
    ///
    /// Idempotent. Returns `true` and notifies the doctor only when the
    /// assignment is new.
    pub fn assign_patient(
        &self,
        doctor_id: DoctorId,
        patient_id: PatientId,
    ) -> ServiceResult<bool> {
        let created = self.repo.assign_patient(doctor_id, patient_id)?;
        if created {
            let doctor = self
                .repo
                .get_doctor(doctor_id)?
                .ok_or_else(|| ServiceError::NotFound(DOCTOR_PROFILE_NOT_FOUND.into()))?;
            let patient = self
                .repo
                .get_patient(patient_id)?
                .ok_or_else(|| ServiceError::NotFound(PATIENT_NOT_FOUND.into()))?;
            self.notify_assignment(&doctor, &patient);
        }
        info!(
            "event=assign_patient module=account_service status=ok doctor_id={} patient_id={} created={}",
            doctor_id, patient_id, created
        );
        Ok(created)
    }

    /// Patients visible as profiles: own profile, or a doctor's assigned set.
    pub fn list_patients(&self, principal: &Principal) -> ServiceResult<Vec<PatientProfile>> {
        match principal {
            Principal::Patient(patient) => Ok(vec![patient.clone()]),
            Principal::Doctor(doctor) => Ok(self.repo.list_assigned_patients(doctor.id)?),
            Principal::Unknown(_) => Ok(Vec::new()),
        }
    }

    pub fn get_patient(
        &self,
        principal: &Principal,
        patient_id: PatientId,
    ) -> ServiceResult<PatientProfile> {
        self.owned_patient(principal, patient_id)
    }

    pub fn update_patient(
        &self,
        principal: &Principal,
        patient_id: PatientId,
        update: &PatientProfileUpdate,
    ) -> ServiceResult<PatientProfile> {
        let patient = self.owned_patient(principal, patient_id)?;
        update.validate()?;
        if update.is_empty() {
            return Ok(patient);
        }
        Ok(self.repo.update_patient(patient.id, update)?)
    }

    /// Deletes the caller's own patient profile with its records and notes.
    pub fn delete_patient(
        &self,
        principal: &Principal,
        patient_id: PatientId,
    ) -> ServiceResult<()> {
        let patient = self.owned_patient(principal, patient_id)?;
        self.repo.delete_patient(patient.id)?;
        info!(
            "event=delete_patient module=account_service status=ok patient_id={}",
            patient.id
        );
        Ok(())
    }

    /// Doctor profiles visible to the caller: only their own.
    pub fn list_doctors(&self, principal: &Principal) -> ServiceResult<Vec<DoctorProfile>> {
        Ok(principal.as_doctor().cloned().into_iter().collect())
    }

    pub fn get_doctor(
        &self,
        principal: &Principal,
        doctor_id: DoctorId,
    ) -> ServiceResult<DoctorProfile> {
        self.owned_doctor(principal, doctor_id)
    }

    pub fn update_doctor(
        &self,
        principal: &Principal,
        doctor_id: DoctorId,
        update: &DoctorProfileUpdate,
    ) -> ServiceResult<DoctorProfile> {
        let doctor = self.owned_doctor(principal, doctor_id)?;
        update.validate()?;
        if update.is_empty() {
            return Ok(doctor);
        }
        Ok(self.repo.update_doctor(doctor.id, update)?)
    }

    pub fn delete_doctor(&self, principal: &Principal, doctor_id: DoctorId) -> ServiceResult<()> {
        let doctor = self.owned_doctor(principal, doctor_id)?;
        self.repo.delete_doctor(doctor.id)?;
        info!(
            "event=delete_doctor module=account_service status=ok doctor_id={}",
            doctor.id
        );
        Ok(())
    }

    fn owned_patient(
        &self,
        principal: &Principal,
        patient_id: PatientId,
    ) -> ServiceResult<PatientProfile> {
        match self.repo.get_patient(patient_id)? {
            Some(patient) if can_access_patient_profile(principal, &patient) => Ok(patient),
            _ => Err(ServiceError::NotFound(PATIENT_NOT_FOUND.into())),
        }
    }

    fn owned_doctor(
        &self,
        principal: &Principal,
        doctor_id: DoctorId,
    ) -> ServiceResult<DoctorProfile> {
        match self.repo.get_doctor(doctor_id)? {
            Some(doctor) if can_access_doctor_profile(principal, &doctor) => Ok(doctor),
            _ => Err(ServiceError::NotFound(DOCTOR_PROFILE_NOT_FOUND.into())),
        }
    }

    fn notify_assignment(&self, doctor: &DoctorProfile, patient: &PatientProfile) {
        let notice = AssignmentNotice {
            doctor_id: doctor.id,
            doctor_email: doctor.user.email.clone(),
            patient_id: patient.id,
            patient_name: patient.user.username.clone(),
        };
        deliver_best_effort(self.notifier.as_ref(), &notice);
    }
}
