//! Health record and doctor note use-cases.
//!
//! # Responsibility
//! - List, create, read, update and delete health records under the access
//!   policy.
//! - List and create doctor notes on records.
//!
//! # Invariants
//! - A new record is always owned by the calling patient's own profile.
//! - Every read path is scoped by `visible_health_records`; invisible records
//!   answer `NotFound`.
//! - Only the owning patient may change or delete a record.
//! - Only an assigned doctor may add a note.

use crate::model::profile::PatientId;
use crate::model::record::{
    validate_note_text, DoctorNote, HealthRecord, HealthRecordDetail, HealthRecordDraft,
    HealthRecordId, HealthRecordPatch,
};
use crate::policy::{can_add_note, can_view_health_record, visible_health_records, Principal};
use crate::repo::account_repo::AccountRepository;
use crate::repo::record_repo::RecordRepository;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

const RECORD_NOT_FOUND: &str = "Health record not found";
const PATIENT_NOT_ASSIGNED: &str = "Patient not found or not assigned to you";

/// Record use-case service.
pub struct RecordService<A: AccountRepository, R: RecordRepository> {
    accounts: A,
    records: R,
}

impl<A: AccountRepository, R: RecordRepository> RecordService<A, R> {
    pub fn new(accounts: A, records: R) -> Self {
        Self { accounts, records }
    }

    /// Records visible to the caller. Unknown principals get an empty list.
    pub fn list_health_records(&self, principal: &Principal) -> ServiceResult<Vec<HealthRecord>> {
        Ok(visible_health_records(principal, &self.records)?)
    }

    /// Visible records with their notes attached.
    pub fn list_health_record_details(
        &self,
        principal: &Principal,
    ) -> ServiceResult<Vec<HealthRecordDetail>> {
        let records = self.list_health_records(principal)?;
        self.attach_notes(records)
    }

    /// Creates a record owned by the calling patient.
    ///
    /// Ownership comes from the principal only; there is no way to name
    /// another patient.
    pub fn create_health_record(
        &self,
        principal: &Principal,
        draft: &HealthRecordDraft,
    ) -> ServiceResult<HealthRecord> {
        let patient = principal.as_patient().ok_or_else(|| {
            ServiceError::Authorization("Only patients can create health records".into())
        })?;
        let draft = draft.normalized()?;
        let record = self.records.create_health_record(patient.id, &draft)?;
        info!(
            "event=create_health_record module=record_service status=ok record_id={} patient_id={}",
            record.id, patient.id
        );
        Ok(record)
    }

    pub fn get_health_record(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
    ) -> ServiceResult<HealthRecordDetail> {
        let record = self.visible_record(principal, record_id)?;
        let doctor_notes = self.records.list_notes(record.id)?;
        Ok(HealthRecordDetail {
            record,
            doctor_notes,
        })
    }

    /// Replaces title/description of the caller's own record.
    pub fn update_health_record(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
        patch: &HealthRecordPatch,
    ) -> ServiceResult<HealthRecord> {
        let record = self.owned_record(principal, record_id)?;
        let draft = patch.apply_to(&record).normalized()?;
        Ok(self.records.update_health_record(record.id, &draft)?)
    }

    /// Deletes the caller's own record and its notes.
    pub fn delete_health_record(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
    ) -> ServiceResult<()> {
        let record = self.owned_record(principal, record_id)?;
        self.records.delete_health_record(record.id)?;
        info!(
            "event=delete_health_record module=record_service status=ok record_id={}",
            record.id
        );
        Ok(())
    }

    /// Records of one patient, for an assigned doctor.
    ///
    /// # Errors
    /// - `Authorization` when the caller is not a doctor.
    /// - `NotFound` when the patient does not exist or is not assigned.
    pub fn list_patient_records(
        &self,
        principal: &Principal,
        patient_id: PatientId,
    ) -> ServiceResult<Vec<HealthRecordDetail>> {
        let doctor = principal.as_doctor().ok_or_else(|| {
            ServiceError::Authorization("Only doctors can view patient records".into())
        })?;
        if !self.accounts.is_assigned(doctor.id, patient_id)? {
            return Err(ServiceError::NotFound(PATIENT_NOT_ASSIGNED.into()));
        }
        let records = self.records.list_records_for_patient(patient_id)?;
        self.attach_notes(records)
    }

    /// Records of the caller's own patient profile.
    pub fn list_own_patient_records(
        &self,
        principal: &Principal,
        patient_id: PatientId,
    ) -> ServiceResult<Vec<HealthRecordDetail>> {
        match principal.as_patient() {
            Some(patient) if patient.id == patient_id => {
                let records = self.records.list_records_for_patient(patient.id)?;
                self.attach_notes(records)
            }
            _ => Err(ServiceError::NotFound("patient not found".into())),
        }
    }

    /// Notes of a visible record in creation order.
    pub fn list_notes_for_record(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
    ) -> ServiceResult<Vec<DoctorNote>> {
        let record = self.visible_record(principal, record_id)?;
        Ok(self.records.list_notes(record.id)?)
    }

    /// Adds a note authored by the calling doctor.
    ///
    /// # Errors
    /// - `NotFound` when the record does not exist.
    /// - `Authorization` when the caller is not a doctor or not assigned to
    ///   the record's patient.
    /// - `Validation` when the note text is blank.
    pub fn create_note(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
        note: &str,
    ) -> ServiceResult<DoctorNote> {
        let record = self
            .records
            .get_health_record(record_id)?
            .ok_or_else(|| ServiceError::NotFound(RECORD_NOT_FOUND.into()))?;

        let doctor = principal
            .as_doctor()
            .ok_or_else(|| ServiceError::Authorization("Only doctors can add notes".into()))?;

        if !can_add_note(principal, &record, &self.accounts)? {
            warn!(
                "event=create_note module=record_service status=denied record_id={} doctor_id={}",
                record.id, doctor.id
            );
            return Err(ServiceError::Authorization(
                "You don't have permission to add notes to this patient's record".into(),
            ));
        }

        validate_note_text(note)?;
        let created = self.records.create_note(doctor.id, record.id, note)?;
        info!(
            "event=create_note module=record_service status=ok record_id={} doctor_id={} note_id={}",
            record.id, doctor.id, created.id
        );
        Ok(created)
    }

    fn visible_record(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
    ) -> ServiceResult<HealthRecord> {
        match self.records.get_health_record(record_id)? {
            Some(record) if can_view_health_record(principal, &record, &self.accounts)? => {
                Ok(record)
            }
            _ => Err(ServiceError::NotFound(RECORD_NOT_FOUND.into())),
        }
    }

    fn owned_record(
        &self,
        principal: &Principal,
        record_id: HealthRecordId,
    ) -> ServiceResult<HealthRecord> {
        let record = self.visible_record(principal, record_id)?;
        match principal.as_patient() {
            Some(patient) if patient.id == record.patient_id => Ok(record),
            _ => Err(ServiceError::Authorization(
                "Only the owning patient can modify this health record".into(),
            )),
        }
    }

    fn attach_notes(&self, records: Vec<HealthRecord>) -> ServiceResult<Vec<HealthRecordDetail>> {
        let mut details = Vec::with_capacity(records.len());
        for record in records {
            let doctor_notes = self.records.list_notes(record.id)?;
            details.push(HealthRecordDetail {
                record,
                doctor_notes,
            });
        }
        Ok(details)
    }
}
