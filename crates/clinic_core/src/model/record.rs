//! Health records and doctor notes.
//!
//! # Responsibility
//! - Define the record/note read models exposed to callers.
//! - Validate caller-supplied record content.
//!
//! # Invariants
//! - A record belongs to exactly one patient; the owner never changes.
//! - `created_at` is assigned by storage at insert and is immutable.
//! - Notes of a record are ordered by `created_at`, then insertion order.

use crate::model::profile::{DoctorId, PatientId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TITLE_MAX_CHARS: usize = 200;

pub type HealthRecordId = Uuid;
pub type DoctorNoteId = Uuid;

/// Health record owned by one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub id: HealthRecordId,
    #[serde(rename = "patient")]
    pub patient_id: PatientId,
    pub title: String,
    pub description: String,
    /// Epoch milliseconds. Serialized as `date` to match the external schema.
    #[serde(rename = "date")]
    pub created_at: i64,
}

/// Note written by a doctor on a health record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorNote {
    pub id: DoctorNoteId,
    #[serde(rename = "doctor")]
    pub doctor_id: DoctorId,
    #[serde(rename = "health_record")]
    pub health_record_id: HealthRecordId,
    /// Author's username at read time.
    pub doctor_name: String,
    pub note: String,
    #[serde(rename = "date")]
    pub created_at: i64,
}

/// Record with its notes, as returned by record read paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecordDetail {
    #[serde(flatten)]
    pub record: HealthRecord,
    pub doctor_notes: Vec<DoctorNote>,
}

/// Caller-supplied record content for create and full update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthRecordDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl HealthRecordDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Returns a copy with a trimmed title after validation.
    pub fn normalized(&self) -> Result<Self, RecordValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(RecordValidationError::BlankTitle);
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(RecordValidationError::TitleTooLong {
                max_chars: TITLE_MAX_CHARS,
            });
        }
        Ok(Self {
            title: title.to_string(),
            description: self.description.clone(),
        })
    }
}

/// Partial record update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthRecordPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl HealthRecordPatch {
    /// Merges this patch over the stored record into a full draft.
    pub fn apply_to(&self, record: &HealthRecord) -> HealthRecordDraft {
        HealthRecordDraft {
            title: self.title.clone().unwrap_or_else(|| record.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| record.description.clone()),
        }
    }
}

/// Record and note content validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    BlankTitle,
    TitleTooLong { max_chars: usize },
    BlankNote,
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "title: this field may not be blank"),
            Self::TitleTooLong { max_chars } => write!(
                f,
                "title: ensure this field has no more than {max_chars} characters"
            ),
            Self::BlankNote => write!(f, "note: this field may not be blank"),
        }
    }
}

impl Error for RecordValidationError {}

/// Checks note text before a note is attached to a record.
pub fn validate_note_text(note: &str) -> Result<(), RecordValidationError> {
    if note.trim().is_empty() {
        return Err(RecordValidationError::BlankNote);
    }
    Ok(())
}
