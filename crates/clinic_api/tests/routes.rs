use clinic_api::{dispatch, ApiConfig, ApiContext, ApiRequest, ApiResponse, Method};
use clinic_core::db::open_db_in_memory;
use clinic_core::{CredentialError, CredentialHasher, LogNotifier, UserId};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        Ok(format!("plain${password}"))
    }
}

fn context() -> ApiContext {
    ApiContext::new(
        open_db_in_memory().unwrap(),
        Arc::new(PlainHasher),
        Arc::new(LogNotifier),
    )
}

fn call(
    ctx: &ApiContext,
    method: Method,
    path: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> ApiResponse {
    let mut request = ApiRequest::new(method, path);
    request.user = user;
    request.body = body;
    dispatch(ctx, &request)
}

fn register(ctx: &ApiContext, body: Value) -> ApiResponse {
    call(ctx, Method::Post, "/register/", None, Some(body))
}

fn user_id(ctx: &ApiContext, username: &str) -> UserId {
    let raw: String = ctx
        .connection()
        .query_row("SELECT id FROM users WHERE username = ?1;", [username], |row| {
            row.get(0)
        })
        .unwrap();
    Uuid::parse_str(&raw).unwrap()
}

fn register_doctor(ctx: &ApiContext, username: &str) -> (UserId, String) {
    let response = register(
        ctx,
        json!({
            "username": username,
            "email": format!("{username}@clinic.test"),
            "password": "pw",
            "user_type": "doctor",
        }),
    );
    assert!(response.is_success(), "{}", response.body);
    assert_eq!(response.status, 201);
    let user = user_id(ctx, username);
    let doctor_id = call(ctx, Method::Get, "/doctors/", Some(user), None).body[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    (user, doctor_id)
}

fn register_patient(ctx: &ApiContext, username: &str, doctor_id: &str) -> (UserId, String) {
    let response = register(
        ctx,
        json!({
            "username": username,
            "password": "pw",
            "user_type": "patient",
            "doctor_id": doctor_id,
        }),
    );
    assert!(response.is_success(), "{}", response.body);
    assert_eq!(response.status, 201);
    let user = user_id(ctx, username);
    let patient_id = call(ctx, Method::Get, "/patients/", Some(user), None).body[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    (user, patient_id)
}

#[test]
fn registration_reports_assigned_doctor() {
    let ctx = context();
    let (_, dr_a) = register_doctor(&ctx, "drA");

    let response = register(
        &ctx,
        json!({ "username": "p1", "password": "pw", "doctor_id": dr_a }),
    );

    assert_eq!(response.status, 201);
    assert_eq!(
        response.body,
        json!({
            "message": "User registered successfully",
            "user_type": "patient",
            "username": "p1",
            "doctor": "drA",
        })
    );
}

#[test]
fn registration_validation_failures_answer_400() {
    let ctx = context();

    let missing_doctor = register(&ctx, json!({ "username": "p1", "password": "pw" }));
    assert_eq!(missing_doctor.status, 400);
    assert_eq!(missing_doctor.body["kind"], "validation");
    assert_eq!(
        missing_doctor.body["error"],
        "Doctor selection is required for patient registration"
    );

    let unknown_doctor = register(
        &ctx,
        json!({ "username": "p1", "password": "pw", "doctor_id": Uuid::new_v4().to_string() }),
    );
    assert_eq!(unknown_doctor.status, 400);
    assert_eq!(unknown_doctor.body["error"], "Selected doctor not found");

    let bad_type = register(
        &ctx,
        json!({ "username": "x", "password": "pw", "user_type": "nurse" }),
    );
    assert_eq!(bad_type.status, 400);

    let malformed = register(&ctx, json!({ "username": 42 }));
    assert_eq!(malformed.status, 400);

    let directory = call(&ctx, Method::Get, "/available-doctors/", None, None);
    assert_eq!(directory.body, json!([]));
}

#[test]
fn anonymous_callers_are_rejected_outside_public_routes() {
    let ctx = context();
    for path in ["/user-type/", "/health-records/", "/patients/", "/doctors/patients/"] {
        let response = call(&ctx, Method::Get, path, None, None);
        assert_eq!(response.status, 401, "{path}");
        assert!(response.body["detail"].is_string());
    }

    let stale_user = call(&ctx, Method::Get, "/user-type/", Some(Uuid::new_v4()), None);
    assert_eq!(stale_user.status, 401);

    let directory = call(&ctx, Method::Get, "/available-doctors/", None, None);
    assert_eq!(directory.status, 200);
}

#[test]
fn unknown_paths_methods_and_ids() {
    let ctx = context();
    let (dr_user, _) = register_doctor(&ctx, "drA");

    assert_eq!(call(&ctx, Method::Get, "/nothing/", None, None).status, 404);
    assert_eq!(call(&ctx, Method::Post, "/patients/", Some(dr_user), None).status, 405);
    assert_eq!(call(&ctx, Method::Post, "/doctors/", Some(dr_user), None).status, 405);
    assert_eq!(call(&ctx, Method::Delete, "/health-records/", Some(dr_user), None).status, 405);
    assert_eq!(
        call(&ctx, Method::Get, "/health-records/not-a-uuid/", Some(dr_user), None).status,
        404
    );
    assert_eq!(call(&ctx, Method::Get, "/register/", None, None).status, 405);
}

#[test]
fn user_type_reflects_role() {
    let ctx = context();
    let (dr_user, dr_a) = register_doctor(&ctx, "drA");
    let (p_user, _) = register_patient(&ctx, "p1", &dr_a);

    let doctor = call(&ctx, Method::Get, "/user-type/", Some(dr_user), None);
    assert_eq!(doctor.body, json!({ "user_type": "doctor" }));
    let patient = call(&ctx, Method::Get, "/user-type/", Some(p_user), None);
    assert_eq!(patient.body, json!({ "user_type": "patient" }));

    let staff = Uuid::new_v4();
    ctx.connection()
        .execute(
            "INSERT INTO users (id, username, password_hash) VALUES (?1, 'staff', 'x');",
            [staff.to_string()],
        )
        .unwrap();
    let unknown = call(&ctx, Method::Get, "/user-type/", Some(staff), None);
    assert_eq!(unknown.status, 200);
    assert_eq!(unknown.body, json!({ "user_type": "unknown" }));
}

#[test]
fn records_and_notes_follow_assignment() {
    let ctx = context();
    let (dr_a_user, dr_a) = register_doctor(&ctx, "drA");
    let (dr_b_user, _) = register_doctor(&ctx, "drB");
    let (p1_user, p1) = register_patient(&ctx, "p1", &dr_a);

    let created = call(
        &ctx,
        Method::Post,
        "/health-records/",
        Some(p1_user),
        Some(json!({
            "title": "Checkup",
            "description": "BP normal",
            "patient": Uuid::new_v4().to_string(),
        })),
    );
    assert_eq!(created.status, 201, "{}", created.body);
    assert_eq!(created.body["patient"], p1.as_str());
    assert!(created.body["date"].is_i64());
    let record_id = created.body["id"].as_str().unwrap().to_string();
    let record_path = format!("/health-records/{record_id}/");
    let notes_path = format!("/health-records/{record_id}/notes/");

    let note = call(
        &ctx,
        Method::Post,
        &notes_path,
        Some(dr_a_user),
        Some(json!({ "note": "Follow up in 2 weeks" })),
    );
    assert_eq!(note.status, 201, "{}", note.body);
    assert_eq!(note.body["doctor_name"], "drA");
    assert_eq!(note.body["doctor"], dr_a.as_str());
    assert_eq!(note.body["health_record"], record_id.as_str());

    let denied = call(
        &ctx,
        Method::Post,
        &notes_path,
        Some(dr_b_user),
        Some(json!({ "note": "hello" })),
    );
    assert_eq!(denied.status, 403);
    assert_eq!(
        denied.body["error"],
        "You don't have permission to add notes to this patient's record"
    );

    assert!(!denied.is_success());

    let second = call(
        &ctx,
        Method::Post,
        &notes_path,
        Some(dr_a_user),
        Some(json!({ "note": "Labs ordered" })),
    );
    assert!(second.is_success(), "{}", second.body);
    for reader in [dr_a_user, p1_user] {
        let notes = call(&ctx, Method::Get, &notes_path, Some(reader), None);
        assert_eq!(notes.status, 200, "{}", notes.body);
        let texts: Vec<&str> = notes
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|note| note["note"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["Follow up in 2 weeks", "Labs ordered"]);
    }
    let hidden = call(&ctx, Method::Get, &notes_path, Some(dr_b_user), None);
    assert_eq!(hidden.status, 404);
    assert!(!hidden.is_success());

    let for_a = call(&ctx, Method::Get, "/health-records/", Some(dr_a_user), None);
    assert_eq!(for_a.body.as_array().unwrap().len(), 1);
    let for_b = call(&ctx, Method::Get, "/health-records/", Some(dr_b_user), None);
    assert_eq!(for_b.body, json!([]));
    assert_eq!(call(&ctx, Method::Get, &record_path, Some(dr_b_user), None).status, 404);

    let detail = call(&ctx, Method::Get, &record_path, Some(p1_user), None);
    assert_eq!(detail.status, 200);
    assert_eq!(detail.body["doctor_notes"].as_array().unwrap().len(), 2);
    assert_eq!(detail.body["doctor_notes"][0]["note"], "Follow up in 2 weeks");

    let patient_records = format!("/patient-records/{p1}/");
    let listed = call(&ctx, Method::Get, &patient_records, Some(dr_a_user), None);
    assert_eq!(listed.body.as_array().unwrap().len(), 1);
    assert_eq!(call(&ctx, Method::Get, &patient_records, Some(dr_b_user), None).status, 404);
    assert_eq!(call(&ctx, Method::Get, &patient_records, Some(p1_user), None).status, 403);

    let assigned = call(&ctx, Method::Get, "/doctors/patients/", Some(dr_a_user), None);
    assert_eq!(assigned.body[0]["id"], p1.as_str());
    assert_eq!(call(&ctx, Method::Get, "/doctors/patients/", Some(p1_user), None).status, 403);
}

#[test]
fn record_updates_are_owner_only() {
    let ctx = context();
    let (dr_a_user, dr_a) = register_doctor(&ctx, "drA");
    let (p1_user, _) = register_patient(&ctx, "p1", &dr_a);

    let created = call(
        &ctx,
        Method::Post,
        "/health-records/",
        Some(p1_user),
        Some(json!({ "title": "Checkup" })),
    );
    let record_path = format!("/health-records/{}/", created.body["id"].as_str().unwrap());

    let by_doctor = call(
        &ctx,
        Method::Patch,
        &record_path,
        Some(dr_a_user),
        Some(json!({ "description": "edited" })),
    );
    assert_eq!(by_doctor.status, 403);

    let patched = call(
        &ctx,
        Method::Patch,
        &record_path,
        Some(p1_user),
        Some(json!({ "description": "edited" })),
    );
    assert_eq!(patched.status, 200);
    assert_eq!(patched.body["title"], "Checkup");
    assert_eq!(patched.body["description"], "edited");
    assert_eq!(patched.body["date"], created.body["date"]);

    let replaced_without_title = call(
        &ctx,
        Method::Put,
        &record_path,
        Some(p1_user),
        Some(json!({ "description": "x" })),
    );
    assert_eq!(replaced_without_title.status, 400);

    assert_eq!(call(&ctx, Method::Delete, &record_path, Some(p1_user), None).status, 204);
    assert_eq!(call(&ctx, Method::Get, &record_path, Some(p1_user), None).status, 404);
}

#[test]
fn profiles_are_visible_to_their_owner_only() {
    let ctx = context();
    let (dr_a_user, dr_a) = register_doctor(&ctx, "drA");
    let (p1_user, p1) = register_patient(&ctx, "p1", &dr_a);
    let patient_path = format!("/patients/{p1}/");
    let doctor_path = format!("/doctors/{dr_a}/");

    assert_eq!(call(&ctx, Method::Get, &patient_path, Some(dr_a_user), None).status, 404);
    assert_eq!(call(&ctx, Method::Get, &doctor_path, Some(p1_user), None).status, 404);

    let updated = call(
        &ctx,
        Method::Patch,
        &patient_path,
        Some(p1_user),
        Some(json!({ "date_of_birth": "1990-02-28", "address": "1 Main St" })),
    );
    assert_eq!(updated.status, 200, "{}", updated.body);
    assert_eq!(updated.body["date_of_birth"], "1990-02-28");
    assert_eq!(updated.body["address"], "1 Main St");

    let bad_date = call(
        &ctx,
        Method::Patch,
        &patient_path,
        Some(p1_user),
        Some(json!({ "date_of_birth": "1990-13-01" })),
    );
    assert_eq!(bad_date.status, 400);
    assert_eq!(bad_date.body["kind"], "validation");
    assert!(bad_date.body["error"]
        .as_str()
        .unwrap()
        .contains("date_of_birth"));

    let doctor = call(
        &ctx,
        Method::Put,
        &doctor_path,
        Some(dr_a_user),
        Some(json!({ "specialization": "Cardiology", "license_number": "L-1" })),
    );
    assert_eq!(doctor.status, 200);
    assert_eq!(doctor.body["specialization"], "Cardiology");

    let own_records = format!("/patients/{p1}/health_records/");
    assert_eq!(call(&ctx, Method::Get, &own_records, Some(p1_user), None).body, json!([]));

    assert_eq!(call(&ctx, Method::Delete, &patient_path, Some(p1_user), None).status, 204);
    assert_eq!(
        call(&ctx, Method::Get, "/doctors/patients/", Some(dr_a_user), None).body,
        json!([])
    );
}

#[test]
fn context_opens_configured_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clinic.sqlite3");
    let db_path_text = db_path.to_string_lossy().to_string();
    let config = ApiConfig::from_lookup(|key| {
        (key == clinic_api::config::DB_PATH_VAR).then(|| db_path_text.clone())
    });

    let first = ApiContext::open(&config, Arc::new(PlainHasher), Arc::new(LogNotifier)).unwrap();
    register_doctor(&first, "drA");
    drop(first);

    let second = ApiContext::open(&config, Arc::new(PlainHasher), Arc::new(LogNotifier)).unwrap();
    let directory = call(&second, Method::Get, "/available-doctors/", None, None);
    assert_eq!(directory.body[0]["username"], "drA");
    assert!(db_path.exists());
}
