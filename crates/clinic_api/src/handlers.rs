//! Route handlers: decode bodies, call services, encode results.

use crate::context::ApiContext;
use crate::http::{ApiError, ApiResponse};
use clinic_core::{
    DoctorId, DoctorProfileUpdate, HealthRecordDraft, HealthRecordId, HealthRecordPatch,
    NewCredentials, PatientId, PatientProfileUpdate, Principal, RegistrationRequest, Role,
    ServiceError,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

type HandlerResult = Result<ApiResponse, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
    user_type: Option<String>,
    doctor_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoteBody {
    note: String,
}

pub(crate) fn register(ctx: &ApiContext, body: Option<&Value>) -> HandlerResult {
    let body: RegisterBody = decode(body)?;
    let role = match body.user_type.as_deref().map(str::trim) {
        None | Some("") | Some("patient") => Role::Patient,
        Some("doctor") => Role::Doctor,
        Some(other) => {
            return Err(ServiceError::Validation(format!(
                "user_type: `{other}` is not a valid choice"
            ))
            .into())
        }
    };

    let request = RegistrationRequest {
        credentials: NewCredentials {
            username: body.username,
            email: body.email,
            password: body.password,
        },
        role,
        doctor_id: registration_doctor_id(role, body.doctor_id.as_ref())?,
    };

    let registration = ctx.accounts()?.register(&request, ctx.hasher())?;
    Ok(ApiResponse::new(
        201,
        json!({
            "message": "User registered successfully",
            "user_type": registration.role.as_str(),
            "username": registration.user.username,
            "doctor": registration.doctor,
        }),
    ))
}

pub(crate) fn user_type(ctx: &ApiContext, principal: &Principal) -> HandlerResult {
    let label = ctx.accounts()?.resolve_role(principal);
    ApiResponse::ok(&json!({ "user_type": label }))
}

pub(crate) fn available_doctors(ctx: &ApiContext) -> HandlerResult {
    ApiResponse::ok(&ctx.accounts()?.list_available_doctors()?)
}

pub(crate) fn patient_records(
    ctx: &ApiContext,
    principal: &Principal,
    patient_id: PatientId,
) -> HandlerResult {
    ApiResponse::ok(&ctx.records()?.list_patient_records(principal, patient_id)?)
}

pub(crate) fn list_health_records(ctx: &ApiContext, principal: &Principal) -> HandlerResult {
    ApiResponse::ok(&ctx.records()?.list_health_record_details(principal)?)
}

/// Any `patient` field in the body is ignored; the owner is the caller.
pub(crate) fn create_health_record(
    ctx: &ApiContext,
    principal: &Principal,
    body: Option<&Value>,
) -> HandlerResult {
    let draft: HealthRecordDraft = decode(body)?;
    let records = ctx.records()?;
    let record = records.create_health_record(principal, &draft)?;
    ApiResponse::created(&records.get_health_record(principal, record.id)?)
}

pub(crate) fn get_health_record(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
) -> HandlerResult {
    ApiResponse::ok(&ctx.records()?.get_health_record(principal, record_id)?)
}

pub(crate) fn replace_health_record(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
    body: Option<&Value>,
) -> HandlerResult {
    let draft: HealthRecordDraft = decode(body)?;
    let patch = HealthRecordPatch {
        title: Some(draft.title),
        description: Some(draft.description),
    };
    update_health_record(ctx, principal, record_id, &patch)
}

pub(crate) fn patch_health_record(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
    body: Option<&Value>,
) -> HandlerResult {
    let patch: HealthRecordPatch = decode(body)?;
    update_health_record(ctx, principal, record_id, &patch)
}

fn update_health_record(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
    patch: &HealthRecordPatch,
) -> HandlerResult {
    let records = ctx.records()?;
    records.update_health_record(principal, record_id, patch)?;
    ApiResponse::ok(&records.get_health_record(principal, record_id)?)
}

pub(crate) fn delete_health_record(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
) -> HandlerResult {
    ctx.records()?.delete_health_record(principal, record_id)?;
    Ok(ApiResponse::no_content())
}

pub(crate) fn list_notes(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
) -> HandlerResult {
    ApiResponse::ok(&ctx.records()?.list_notes_for_record(principal, record_id)?)
}

pub(crate) fn create_note(
    ctx: &ApiContext,
    principal: &Principal,
    record_id: HealthRecordId,
    body: Option<&Value>,
) -> HandlerResult {
    let body: NoteBody = decode(body)?;
    ApiResponse::created(&ctx.records()?.create_note(principal, record_id, &body.note)?)
}

pub(crate) fn list_patients(ctx: &ApiContext, principal: &Principal) -> HandlerResult {
    ApiResponse::ok(&ctx.accounts()?.list_patients(principal)?)
}

pub(crate) fn get_patient(
    ctx: &ApiContext,
    principal: &Principal,
    patient_id: PatientId,
) -> HandlerResult {
    ApiResponse::ok(&ctx.accounts()?.get_patient(principal, patient_id)?)
}

pub(crate) fn update_patient(
    ctx: &ApiContext,
    principal: &Principal,
    patient_id: PatientId,
    body: Option<&Value>,
) -> HandlerResult {
    let update: PatientProfileUpdate = decode(body)?;
    ApiResponse::ok(&ctx.accounts()?.update_patient(principal, patient_id, &update)?)
}

pub(crate) fn delete_patient(
    ctx: &ApiContext,
    principal: &Principal,
    patient_id: PatientId,
) -> HandlerResult {
    ctx.accounts()?.delete_patient(principal, patient_id)?;
    Ok(ApiResponse::no_content())
}

/// Doctors get the assigned patient's records; patients get their own.
pub(crate) fn patient_health_records(
    ctx: &ApiContext,
    principal: &Principal,
    patient_id: PatientId,
) -> HandlerResult {
    let records = ctx.records()?;
    let listed = match principal {
        Principal::Doctor(_) => records.list_patient_records(principal, patient_id)?,
        _ => records.list_own_patient_records(principal, patient_id)?,
    };
    ApiResponse::ok(&listed)
}

pub(crate) fn list_doctors(ctx: &ApiContext, principal: &Principal) -> HandlerResult {
    ApiResponse::ok(&ctx.accounts()?.list_doctors(principal)?)
}

pub(crate) fn doctor_patients(ctx: &ApiContext, principal: &Principal) -> HandlerResult {
    ApiResponse::ok(&ctx.accounts()?.list_assigned_patients(principal)?)
}

pub(crate) fn get_doctor(
    ctx: &ApiContext,
    principal: &Principal,
    doctor_id: DoctorId,
) -> HandlerResult {
    ApiResponse::ok(&ctx.accounts()?.get_doctor(principal, doctor_id)?)
}

pub(crate) fn update_doctor(
    ctx: &ApiContext,
    principal: &Principal,
    doctor_id: DoctorId,
    body: Option<&Value>,
) -> HandlerResult {
    let update: DoctorProfileUpdate = decode(body)?;
    ApiResponse::ok(&ctx.accounts()?.update_doctor(principal, doctor_id, &update)?)
}

pub(crate) fn delete_doctor(
    ctx: &ApiContext,
    principal: &Principal,
    doctor_id: DoctorId,
) -> HandlerResult {
    ctx.accounts()?.delete_doctor(principal, doctor_id)?;
    Ok(ApiResponse::no_content())
}

/// A missing body decodes like `{}`.
fn decode<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, ApiError> {
    let value = body.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|err| ApiError::MalformedBody(err.to_string()))
}

/// Doctors ignore `doctor_id`. For patients an id that is not a UUID is
/// reported the same way as an unknown doctor.
fn registration_doctor_id(role: Role, raw: Option<&Value>) -> Result<Option<DoctorId>, ApiError> {
    if role == Role::Doctor {
        return Ok(None);
    }
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(other) => other.to_string(),
    };
    Uuid::parse_str(&text)
        .map(Some)
        .map_err(|_| ServiceError::Validation("Selected doctor not found".into()).into())
}

#[cfg(test)]
mod tests {
    use super::registration_doctor_id;
    use crate::http::ApiError;
    use clinic_core::Role;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn doctor_id_is_ignored_for_doctors() {
        let raw = json!("not-a-uuid");
        assert_eq!(registration_doctor_id(Role::Doctor, Some(&raw)).unwrap(), None);
    }

    #[test]
    fn blank_doctor_id_means_absent() {
        let raw = json!("  ");
        assert_eq!(registration_doctor_id(Role::Patient, Some(&raw)).unwrap(), None);
        assert_eq!(registration_doctor_id(Role::Patient, None).unwrap(), None);
    }

    #[test]
    fn malformed_doctor_id_is_a_validation_error() {
        let raw = json!(17);
        let err = registration_doctor_id(Role::Patient, Some(&raw)).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(matches!(err, ApiError::Service(_)));

        let id = Uuid::new_v4();
        let raw = json!(id.to_string());
        assert_eq!(registration_doctor_id(Role::Patient, Some(&raw)).unwrap(), Some(id));
    }
}
