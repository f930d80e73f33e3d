//! Health record and doctor note persistence.
//!
//! # Responsibility
//! - Provide CRUD over `health_records` and append/list over `doctor_notes`.
//! - Resolve doctor-scoped record lists through the assignment relation.
//!
//! # Invariants
//! - Record and note timestamps come from SQLite defaults, never from callers.
//! - Record lists are ordered by `created_at ASC, rowid ASC`.
//! - Note lists are ordered by `created_at ASC, rowid ASC` (insertion order).

use crate::model::profile::{DoctorId, PatientId};
use crate::model::record::{
    DoctorNote, DoctorNoteId, HealthRecord, HealthRecordDraft, HealthRecordId,
};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    hr.id,
    hr.patient_id,
    hr.title,
    hr.description,
    hr.created_at
FROM health_records hr";

const NOTE_SELECT_SQL: &str = "SELECT
    n.id,
    n.doctor_id,
    n.health_record_id,
    n.note,
    n.created_at,
    u.username AS doctor_name
FROM doctor_notes n
INNER JOIN doctors d ON d.id = n.doctor_id
INNER JOIN users u ON u.id = d.user_id";

/// Repository interface for health records and notes.
pub trait RecordRepository {
    /// Inserts a record owned by `patient_id`.
    fn create_health_record(
        &self,
        patient_id: PatientId,
        draft: &HealthRecordDraft,
    ) -> RepoResult<HealthRecord>;
    /// Loads one record by id.
    fn get_health_record(&self, record_id: HealthRecordId) -> RepoResult<Option<HealthRecord>>;
    /// Lists records owned by one patient.
    fn list_records_for_patient(&self, patient_id: PatientId) -> RepoResult<Vec<HealthRecord>>;
    /// Lists records of every patient assigned to the doctor.
    fn list_records_for_doctor(&self, doctor_id: DoctorId) -> RepoResult<Vec<HealthRecord>>;
    /// Replaces title and description. `created_at` and owner are untouched.
    fn update_health_record(
        &self,
        record_id: HealthRecordId,
        draft: &HealthRecordDraft,
    ) -> RepoResult<HealthRecord>;
    /// Deletes one record; its notes cascade.
    fn delete_health_record(&self, record_id: HealthRecordId) -> RepoResult<()>;
    /// Appends a note authored by `doctor_id` to a record.
    fn create_note(
        &self,
        doctor_id: DoctorId,
        record_id: HealthRecordId,
        note: &str,
    ) -> RepoResult<DoctorNote>;
    /// Lists notes attached to a record in creation order.
    fn list_notes(&self, record_id: HealthRecordId) -> RepoResult<Vec<DoctorNote>>;
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_records(&self, sql: &str, key: Uuid) -> RepoResult<Vec<HealthRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn load_note(&self, note_id: DoctorNoteId) -> RepoResult<Option<DoctorNote>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE n.id = ?1;"))?;
        let mut rows = stmt.query([note_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_note_row(row)?)),
            None => Ok(None),
        }
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create_health_record(
        &self,
        patient_id: PatientId,
        draft: &HealthRecordDraft,
    ) -> RepoResult<HealthRecord> {
        let record_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO health_records (id, patient_id, title, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                record_id.to_string(),
                patient_id.to_string(),
                draft.title.as_str(),
                draft.description.as_str(),
            ],
        )?;

        self.get_health_record(record_id)?.ok_or_else(|| {
            RepoError::InvalidData("created health record missing in read-back".to_string())
        })
    }

    fn get_health_record(&self, record_id: HealthRecordId) -> RepoResult<Option<HealthRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECORD_SELECT_SQL} WHERE hr.id = ?1;"))?;
        let mut rows = stmt.query([record_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_record_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_records_for_patient(&self, patient_id: PatientId) -> RepoResult<Vec<HealthRecord>> {
        self.query_records(
            &format!(
                "{RECORD_SELECT_SQL}
                 WHERE hr.patient_id = ?1
                 ORDER BY hr.created_at ASC, hr.rowid ASC;"
            ),
            patient_id,
        )
    }

    fn list_records_for_doctor(&self, doctor_id: DoctorId) -> RepoResult<Vec<HealthRecord>> {
        self.query_records(
            &format!(
                "{RECORD_SELECT_SQL}
                 INNER JOIN doctor_patients dp ON dp.patient_id = hr.patient_id
                 WHERE dp.doctor_id = ?1
                 ORDER BY hr.created_at ASC, hr.rowid ASC;"
            ),
            doctor_id,
        )
    }

    fn update_health_record(
        &self,
        record_id: HealthRecordId,
        draft: &HealthRecordDraft,
    ) -> RepoResult<HealthRecord> {
        let changed = self.conn.execute(
            "UPDATE health_records
             SET title = ?2, description = ?3
             WHERE id = ?1;",
            params![
                record_id.to_string(),
                draft.title.as_str(),
                draft.description.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "health record",
                id: record_id,
            });
        }

        self.get_health_record(record_id)?.ok_or(RepoError::NotFound {
            entity: "health record",
            id: record_id,
        })
    }

    fn delete_health_record(&self, record_id: HealthRecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM health_records WHERE id = ?1;",
            [record_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "health record",
                id: record_id,
            });
        }
        Ok(())
    }

    fn create_note(
        &self,
        doctor_id: DoctorId,
        record_id: HealthRecordId,
        note: &str,
    ) -> RepoResult<DoctorNote> {
        let note_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO doctor_notes (id, doctor_id, health_record_id, note)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                note_id.to_string(),
                doctor_id.to_string(),
                record_id.to_string(),
                note,
            ],
        )?;

        self.load_note(note_id)?.ok_or_else(|| {
            RepoError::InvalidData("created doctor note missing in read-back".to_string())
        })
    }

    fn list_notes(&self, record_id: HealthRecordId) -> RepoResult<Vec<DoctorNote>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE n.health_record_id = ?1
             ORDER BY n.created_at ASC, n.rowid ASC;"
        ))?;
        let mut rows = stmt.query([record_id.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<HealthRecord> {
    let id_text: String = row.get("id")?;
    let patient_text: String = row.get("patient_id")?;
    Ok(HealthRecord {
        id: parse_uuid(&id_text, "health_records.id")?,
        patient_id: parse_uuid(&patient_text, "health_records.patient_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<DoctorNote> {
    let id_text: String = row.get("id")?;
    let doctor_text: String = row.get("doctor_id")?;
    let record_text: String = row.get("health_record_id")?;
    Ok(DoctorNote {
        id: parse_uuid(&id_text, "doctor_notes.id")?,
        doctor_id: parse_uuid(&doctor_text, "doctor_notes.doctor_id")?,
        health_record_id: parse_uuid(&record_text, "doctor_notes.health_record_id")?,
        doctor_name: row.get("doctor_name")?,
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}
