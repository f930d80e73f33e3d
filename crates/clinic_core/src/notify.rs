//! Doctor assignment notifications.
//!
//! # Responsibility
//! - Describe a newly created doctor-patient assignment.
//! - Compose the message delivered to the doctor.
//! - Deliver best-effort: failures are logged and never surfaced.
//!
//! # Invariants
//! - Callers invoke delivery once per newly created assignment row, after the
//!   write has committed.
//! - Log lines carry ids only, never names or e-mail addresses.

use crate::model::profile::{DoctorId, PatientId};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};

const ASSIGNMENT_SUBJECT: &str = "New Patient Assigned";
const ASSIGNMENT_SENDER: &str = "from@example.com";

/// A doctor gained a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentNotice {
    pub doctor_id: DoctorId,
    pub doctor_email: String,
    pub patient_id: PatientId,
    pub patient_name: String,
}

impl AssignmentNotice {
    /// Composes the e-mail style message for the assigned doctor.
    pub fn message(&self) -> AssignmentMessage {
        AssignmentMessage {
            subject: ASSIGNMENT_SUBJECT.to_string(),
            body: format!(
                "You have been assigned a new patient: {}",
                self.patient_name
            ),
            sender: ASSIGNMENT_SENDER.to_string(),
            recipient: self.doctor_email.clone(),
        }
    }
}

/// Outbound message for one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentMessage {
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub recipient: String,
}

/// Notification delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The doctor has no e-mail address on file.
    MissingRecipient(DoctorId),
    /// The transport rejected or failed to send the message.
    Delivery(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRecipient(doctor_id) => {
                write!(f, "doctor {doctor_id} has no e-mail address")
            }
            Self::Delivery(message) => write!(f, "notification delivery failed: {message}"),
        }
    }
}

impl Error for NotifyError {}

/// Delivery seam for assignment notifications.
pub trait AssignmentNotifier: Send + Sync {
    fn patient_assigned(&self, notice: &AssignmentNotice) -> Result<(), NotifyError>;
}

/// Default notifier that records outbound messages in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl AssignmentNotifier for LogNotifier {
    fn patient_assigned(&self, notice: &AssignmentNotice) -> Result<(), NotifyError> {
        let message = notice.message();
        if message.recipient.trim().is_empty() {
            return Err(NotifyError::MissingRecipient(notice.doctor_id));
        }
        info!(
            "event=assignment_notice module=notify status=ok doctor_id={} patient_id={} subject_chars={} body_chars={}",
            notice.doctor_id,
            notice.patient_id,
            message.subject.chars().count(),
            message.body.chars().count()
        );
        Ok(())
    }
}

/// Calls the notifier and swallows failures, including a panicking notifier.
///
/// Returns whether delivery succeeded; callers must not branch on it for
/// anything user-visible.
pub fn deliver_best_effort(notifier: &dyn AssignmentNotifier, notice: &AssignmentNotice) -> bool {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| notifier.patient_assigned(notice)));
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(
                "event=assignment_notice module=notify status=error doctor_id={} patient_id={} error={}",
                notice.doctor_id, notice.patient_id, err
            );
            false
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|text| (*text).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            warn!(
                "event=assignment_notice module=notify status=panic doctor_id={} patient_id={} error={}",
                notice.doctor_id, notice.patient_id, reason
            );
            false
        }
    }
}
