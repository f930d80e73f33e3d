//! Path routing and request dispatch.
//!
//! # Responsibility
//! - Match a request path to a route and check the method.
//! - Authenticate the caller and resolve the principal once.
//! - Turn every outcome into an `ApiResponse`.
//!
//! # Invariants
//! - Unknown paths answer 404 before anything else is checked.
//! - Anonymous callers reach only `/register/` and `/available-doctors/`.
//! - Malformed ids in paths answer 404.

use crate::context::ApiContext;
use crate::handlers;
use crate::http::{ApiError, ApiRequest, ApiResponse, Method};
use clinic_core::Principal;
use log::{info, warn};
use std::time::Instant;
use uuid::Uuid;

/// Matched route with its raw path ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Register,
    UserType,
    AvailableDoctors,
    PatientRecords(String),
    HealthRecords,
    HealthRecord(String),
    HealthRecordNotes(String),
    Patients,
    Patient(String),
    PatientHealthRecords(String),
    Doctors,
    DoctorPatients,
    Doctor(String),
}

impl Route {
    /// Matches a path; leading and trailing slashes are optional.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        let route = match segments.as_slice() {
            ["register"] => Self::Register,
            ["user-type"] => Self::UserType,
            ["available-doctors"] => Self::AvailableDoctors,
            ["patient-records", id] => Self::PatientRecords(id.to_string()),
            ["health-records"] => Self::HealthRecords,
            ["health-records", id] => Self::HealthRecord(id.to_string()),
            ["health-records", id, "notes"] => Self::HealthRecordNotes(id.to_string()),
            ["patients"] => Self::Patients,
            ["patients", id] => Self::Patient(id.to_string()),
            ["patients", id, "health_records"] => Self::PatientHealthRecords(id.to_string()),
            ["doctors"] => Self::Doctors,
            ["doctors", "patients"] => Self::DoctorPatients,
            ["doctors", id] => Self::Doctor(id.to_string()),
            _ => return None,
        };
        Some(route)
    }

    /// Stable route label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::UserType => "user_type",
            Self::AvailableDoctors => "available_doctors",
            Self::PatientRecords(_) => "patient_records",
            Self::HealthRecords => "health_records",
            Self::HealthRecord(_) => "health_record",
            Self::HealthRecordNotes(_) => "health_record_notes",
            Self::Patients => "patients",
            Self::Patient(_) => "patient",
            Self::PatientHealthRecords(_) => "patient_health_records",
            Self::Doctors => "doctors",
            Self::DoctorPatients => "doctor_patients",
            Self::Doctor(_) => "doctor",
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Register | Self::AvailableDoctors)
    }

    pub fn allows(&self, method: Method) -> bool {
        use Method::{Delete, Get, Patch, Post, Put};
        match self {
            Self::Register => method == Post,
            Self::UserType
            | Self::AvailableDoctors
            | Self::PatientRecords(_)
            | Self::Patients
            | Self::PatientHealthRecords(_)
            | Self::Doctors
            | Self::DoctorPatients => method == Get,
            Self::HealthRecords | Self::HealthRecordNotes(_) => matches!(method, Get | Post),
            Self::HealthRecord(_) | Self::Patient(_) | Self::Doctor(_) => {
                matches!(method, Get | Put | Patch | Delete)
            }
        }
    }
}

/// Handles one request end to end. Never panics on caller input.
pub fn dispatch(ctx: &ApiContext, request: &ApiRequest) -> ApiResponse {
    let started_at = Instant::now();
    let Some(route) = Route::parse(&request.path) else {
        return ApiError::RouteNotFound.into_response();
    };

    let response = match handle(ctx, &route, request) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };

    if response.status >= 500 {
        warn!(
            "event=api_request module=router status=error route={} method={} http_status={} duration_ms={}",
            route.name(),
            request.method,
            response.status,
            started_at.elapsed().as_millis()
        );
    } else {
        info!(
            "event=api_request module=router status=ok route={} method={} http_status={} duration_ms={}",
            route.name(),
            request.method,
            response.status,
            started_at.elapsed().as_millis()
        );
    }
    response
}

fn handle(ctx: &ApiContext, route: &Route, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let principal = if route.requires_auth() {
        Some(authenticate(ctx, request)?)
    } else {
        None
    };
    if !route.allows(request.method) {
        return Err(ApiError::MethodNotAllowed(request.method));
    }

    let method = request.method;
    let body = request.body.as_ref();
    let Some(principal) = principal else {
        return match route {
            Route::Register => handlers::register(ctx, body),
            Route::AvailableDoctors => handlers::available_doctors(ctx),
            _ => Err(ApiError::Unauthenticated),
        };
    };
    let principal = &principal;

    match route {
        Route::UserType => handlers::user_type(ctx, principal),
        Route::PatientRecords(id) => handlers::patient_records(ctx, principal, path_id(id)?),
        Route::HealthRecords => match method {
            Method::Post => handlers::create_health_record(ctx, principal, body),
            _ => handlers::list_health_records(ctx, principal),
        },
        Route::HealthRecord(id) => {
            let id = path_id(id)?;
            match method {
                Method::Get => handlers::get_health_record(ctx, principal, id),
                Method::Put => handlers::replace_health_record(ctx, principal, id, body),
                Method::Patch => handlers::patch_health_record(ctx, principal, id, body),
                _ => handlers::delete_health_record(ctx, principal, id),
            }
        }
        Route::HealthRecordNotes(id) => {
            let id = path_id(id)?;
            match method {
                Method::Post => handlers::create_note(ctx, principal, id, body),
                _ => handlers::list_notes(ctx, principal, id),
            }
        }
        Route::Patients => handlers::list_patients(ctx, principal),
        Route::Patient(id) => {
            let id = path_id(id)?;
            match method {
                Method::Get => handlers::get_patient(ctx, principal, id),
                Method::Put | Method::Patch => handlers::update_patient(ctx, principal, id, body),
                _ => handlers::delete_patient(ctx, principal, id),
            }
        }
        Route::PatientHealthRecords(id) => {
            handlers::patient_health_records(ctx, principal, path_id(id)?)
        }
        Route::Doctors => handlers::list_doctors(ctx, principal),
        Route::DoctorPatients => handlers::doctor_patients(ctx, principal),
        Route::Doctor(id) => {
            let id = path_id(id)?;
            match method {
                Method::Get => handlers::get_doctor(ctx, principal, id),
                Method::Put | Method::Patch => handlers::update_doctor(ctx, principal, id, body),
                _ => handlers::delete_doctor(ctx, principal, id),
            }
        }
        Route::Register | Route::AvailableDoctors => Err(ApiError::RouteNotFound),
    }
}

fn authenticate(ctx: &ApiContext, request: &ApiRequest) -> Result<Principal, ApiError> {
    let user_id = request.user.ok_or(ApiError::Unauthenticated)?;
    ctx.accounts()?
        .resolve_principal(user_id)?
        .ok_or(ApiError::Unauthenticated)
}

fn path_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::RouteNotFound)
}

#[cfg(test)]
mod tests {
    use super::Route;
    use crate::http::Method;

    #[test]
    fn parse_accepts_optional_slashes() {
        assert_eq!(Route::parse("/register/"), Some(Route::Register));
        assert_eq!(Route::parse("user-type"), Some(Route::UserType));
        assert_eq!(
            Route::parse("/health-records/abc/notes/"),
            Some(Route::HealthRecordNotes("abc".to_string()))
        );
        assert_eq!(Route::parse("/nope/"), None);
        assert_eq!(Route::parse("/health-records/a/b/"), None);
    }

    #[test]
    fn doctor_patients_wins_over_doctor_id() {
        assert_eq!(Route::parse("/doctors/patients/"), Some(Route::DoctorPatients));
        assert_eq!(
            Route::parse("/doctors/42/"),
            Some(Route::Doctor("42".to_string()))
        );
    }

    #[test]
    fn profile_collections_reject_post() {
        assert!(!Route::Patients.allows(Method::Post));
        assert!(!Route::Doctors.allows(Method::Post));
        assert!(Route::HealthRecords.allows(Method::Post));
        assert!(Route::Patient("x".into()).allows(Method::Patch));
        assert!(!Route::Register.allows(Method::Get));
    }

    #[test]
    fn only_register_and_directory_are_public() {
        assert!(!Route::Register.requires_auth());
        assert!(!Route::AvailableDoctors.requires_auth());
        assert!(Route::UserType.requires_auth());
        assert!(Route::Doctors.requires_auth());
    }
}
