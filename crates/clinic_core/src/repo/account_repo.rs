//! Account, profile and assignment persistence.
//!
//! # Responsibility
//! - Create users together with their role profile and first assignment.
//! - Load profiles by id or by owning user.
//! - Maintain the doctor-to-patient assignment relation.
//!
//! # Invariants
//! - `create_account` writes user, profile and assignment in one transaction.
//! - Assignment rows are only ever inserted; there is no removal API.
//! - Assigned patient lists are ordered by assignment time, then insertion.

use crate::model::profile::{
    DoctorId, DoctorListing, DoctorProfile, DoctorProfileUpdate, PatientId, PatientProfile,
    PatientProfileUpdate,
};
use crate::model::user::{Role, User, UserId, UserSummary};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const PATIENT_SELECT_SQL: &str = "SELECT
    p.id,
    p.date_of_birth,
    p.phone_number,
    p.address,
    u.id AS user_id,
    u.username,
    u.email
FROM patients p
INNER JOIN users u ON u.id = p.user_id";

const DOCTOR_SELECT_SQL: &str = "SELECT
    d.id,
    d.specialization,
    d.license_number,
    u.id AS user_id,
    u.username,
    u.email
FROM doctors d
INNER JOIN users u ON u.id = d.user_id";

/// Write model for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Doctor the new patient is assigned to. Ignored for doctors.
    pub doctor_id: Option<DoctorId>,
}

/// Role profile created alongside a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountProfile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
}

/// Result of a committed registration write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAccount {
    pub user: User,
    pub profile: AccountProfile,
    /// Doctor the patient was assigned to, when one was requested.
    pub assigned_doctor: Option<DoctorProfile>,
}

/// Repository interface for accounts, profiles and assignments.
pub trait AccountRepository {
    /// Creates user, role profile and (for patients) the assignment atomically.
    fn create_account(&self, account: &NewAccount) -> RepoResult<CreatedAccount>;
    /// Loads one user by id.
    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>>;
    /// Loads the patient profile owned by a user.
    fn find_patient_by_user(&self, user_id: UserId) -> RepoResult<Option<PatientProfile>>;
    /// Loads the doctor profile owned by a user.
    fn find_doctor_by_user(&self, user_id: UserId) -> RepoResult<Option<DoctorProfile>>;
    /// Loads one patient profile by id.
    fn get_patient(&self, patient_id: PatientId) -> RepoResult<Option<PatientProfile>>;
    /// Loads one doctor profile by id.
    fn get_doctor(&self, doctor_id: DoctorId) -> RepoResult<Option<DoctorProfile>>;
    /// Lists the doctor's assigned patients.
    fn list_assigned_patients(&self, doctor_id: DoctorId) -> RepoResult<Vec<PatientProfile>>;
    /// Returns whether the patient is in the doctor's assigned set.
    fn is_assigned(&self, doctor_id: DoctorId, patient_id: PatientId) -> RepoResult<bool>;
    /// Adds the patient to the doctor's set. Returns `true` when a row was created.
    fn assign_patient(&self, doctor_id: DoctorId, patient_id: PatientId) -> RepoResult<bool>;
    /// Lists doctors whose user carries the doctor role.
    fn list_directory_doctors(&self) -> RepoResult<Vec<DoctorListing>>;
    /// Applies a partial patient profile update.
    fn update_patient(
        &self,
        patient_id: PatientId,
        update: &PatientProfileUpdate,
    ) -> RepoResult<PatientProfile>;
    /// Applies a partial doctor profile update.
    fn update_doctor(
        &self,
        doctor_id: DoctorId,
        update: &DoctorProfileUpdate,
    ) -> RepoResult<DoctorProfile>;
    /// Deletes a patient profile; records, notes and assignments cascade.
    fn delete_patient(&self, patient_id: PatientId) -> RepoResult<()>;
    /// Deletes a doctor profile; authored notes and assignments cascade.
    fn delete_doctor(&self, doctor_id: DoctorId) -> RepoResult<()>;
}

/// SQLite-backed account repository.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_account(&self, account: &NewAccount) -> RepoResult<CreatedAccount> {
        let tx = self.conn.unchecked_transaction()?;

        let assigned_doctor = match (account.role, account.doctor_id) {
            (Role::Patient, Some(doctor_id)) => Some(
                load_doctor(&tx, doctor_id)?.ok_or(RepoError::NotFound {
                    entity: "doctor",
                    id: doctor_id,
                })?,
            ),
            _ => None,
        };

        let user_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO users (id, username, email, password_hash, role)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user_id.to_string(),
                account.username.as_str(),
                account.email.as_str(),
                account.password_hash.as_str(),
                account.role.as_str(),
            ],
        )?;

        let profile_id = Uuid::new_v4();
        match account.role {
            Role::Patient => {
                tx.execute(
                    "INSERT INTO patients (id, user_id) VALUES (?1, ?2);",
                    params![profile_id.to_string(), user_id.to_string()],
                )?;
            }
            Role::Doctor => {
                tx.execute(
                    "INSERT INTO doctors (id, user_id) VALUES (?1, ?2);",
                    params![profile_id.to_string(), user_id.to_string()],
                )?;
            }
        }

        if let Some(doctor) = &assigned_doctor {
            insert_assignment(&tx, doctor.id, profile_id)?;
        }

        let user = load_user(&tx, user_id)?.ok_or_else(|| {
            RepoError::InvalidData("created user missing in read-back".to_string())
        })?;
        let profile = match account.role {
            Role::Patient => AccountProfile::Patient(load_patient(&tx, profile_id)?.ok_or_else(
                || RepoError::InvalidData("created patient missing in read-back".to_string()),
            )?),
            Role::Doctor => AccountProfile::Doctor(load_doctor(&tx, profile_id)?.ok_or_else(
                || RepoError::InvalidData("created doctor missing in read-back".to_string()),
            )?),
        };

        tx.commit()?;
        Ok(CreatedAccount {
            user,
            profile,
            assigned_doctor,
        })
    }

    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>> {
        load_user(self.conn, user_id)
    }

    fn find_patient_by_user(&self, user_id: UserId) -> RepoResult<Option<PatientProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PATIENT_SELECT_SQL} WHERE p.user_id = ?1;"))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_patient_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_doctor_by_user(&self, user_id: UserId) -> RepoResult<Option<DoctorProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCTOR_SELECT_SQL} WHERE d.user_id = ?1;"))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_doctor_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_patient(&self, patient_id: PatientId) -> RepoResult<Option<PatientProfile>> {
        load_patient(self.conn, patient_id)
    }

    fn get_doctor(&self, doctor_id: DoctorId) -> RepoResult<Option<DoctorProfile>> {
        load_doctor(self.conn, doctor_id)
    }

    fn list_assigned_patients(&self, doctor_id: DoctorId) -> RepoResult<Vec<PatientProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PATIENT_SELECT_SQL}
             INNER JOIN doctor_patients dp ON dp.patient_id = p.id
             WHERE dp.doctor_id = ?1
             ORDER BY dp.created_at ASC, dp.rowid ASC;"
        ))?;
        let mut rows = stmt.query([doctor_id.to_string()])?;
        let mut patients = Vec::new();
        while let Some(row) = rows.next()? {
            patients.push(parse_patient_row(row)?);
        }
        Ok(patients)
    }

    fn is_assigned(&self, doctor_id: DoctorId, patient_id: PatientId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM doctor_patients
                WHERE doctor_id = ?1 AND patient_id = ?2
            );",
            params![doctor_id.to_string(), patient_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn assign_patient(&self, doctor_id: DoctorId, patient_id: PatientId) -> RepoResult<bool> {
        if load_doctor(self.conn, doctor_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "doctor",
                id: doctor_id,
            });
        }
        if load_patient(self.conn, patient_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "patient",
                id: patient_id,
            });
        }
        insert_assignment(self.conn, doctor_id, patient_id)
    }

    fn list_directory_doctors(&self) -> RepoResult<Vec<DoctorListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, u.username, u.email
             FROM doctors d
             INNER JOIN users u ON u.id = d.user_id
             WHERE u.role = 'doctor'
             ORDER BY u.username ASC, d.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut doctors = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            doctors.push(DoctorListing {
                id: parse_uuid(&id_text, "doctors.id")?,
                username: row.get("username")?,
                email: row.get("email")?,
            });
        }
        Ok(doctors)
    }

    fn update_patient(
        &self,
        patient_id: PatientId,
        update: &PatientProfileUpdate,
    ) -> RepoResult<PatientProfile> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(date_of_birth) = &update.date_of_birth {
            assignments.push("date_of_birth = ?");
            bind_values.push(match date_of_birth {
                Some(date) => Value::Text(date.format("%Y-%m-%d").to_string()),
                None => Value::Null,
            });
        }
        if let Some(phone_number) = &update.phone_number {
            assignments.push("phone_number = ?");
            bind_values.push(Value::Text(phone_number.clone()));
        }
        if let Some(address) = &update.address {
            assignments.push("address = ?");
            bind_values.push(Value::Text(address.clone()));
        }

        if !assignments.is_empty() {
            let sql = format!(
                "UPDATE patients SET {} WHERE id = ?;",
                assignments.join(", ")
            );
            bind_values.push(Value::Text(patient_id.to_string()));
            self.conn.execute(&sql, params_from_iter(bind_values))?;
        }

        load_patient(self.conn, patient_id)?.ok_or(RepoError::NotFound {
            entity: "patient",
            id: patient_id,
        })
    }

    fn update_doctor(
        &self,
        doctor_id: DoctorId,
        update: &DoctorProfileUpdate,
    ) -> RepoResult<DoctorProfile> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(specialization) = &update.specialization {
            assignments.push("specialization = ?");
            bind_values.push(Value::Text(specialization.clone()));
        }
        if let Some(license_number) = &update.license_number {
            assignments.push("license_number = ?");
            bind_values.push(Value::Text(license_number.clone()));
        }

        if !assignments.is_empty() {
            let sql = format!("UPDATE doctors SET {} WHERE id = ?;", assignments.join(", "));
            bind_values.push(Value::Text(doctor_id.to_string()));
            self.conn.execute(&sql, params_from_iter(bind_values))?;
        }

        load_doctor(self.conn, doctor_id)?.ok_or(RepoError::NotFound {
            entity: "doctor",
            id: doctor_id,
        })
    }

    fn delete_patient(&self, patient_id: PatientId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?1;", [patient_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "patient",
                id: patient_id,
            });
        }
        Ok(())
    }

    fn delete_doctor(&self, doctor_id: DoctorId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM doctors WHERE id = ?1;", [doctor_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "doctor",
                id: doctor_id,
            });
        }
        Ok(())
    }
}

fn insert_assignment(
    conn: &Connection,
    doctor_id: DoctorId,
    patient_id: PatientId,
) -> RepoResult<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO doctor_patients (doctor_id, patient_id) VALUES (?1, ?2);",
        params![doctor_id.to_string(), patient_id.to_string()],
    )?;
    Ok(changed == 1)
}

fn load_user(conn: &Connection, user_id: UserId) -> RepoResult<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, password_hash, role, created_at
             FROM users
             WHERE id = ?1;",
            [user_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>("id")?,
                    row.get::<_, String>("username")?,
                    row.get::<_, String>("email")?,
                    row.get::<_, String>("password_hash")?,
                    row.get::<_, Option<String>>("role")?,
                    row.get::<_, i64>("created_at")?,
                ))
            },
        )
        .optional()?;

    let Some((id_text, username, email, password_hash, role_text, created_at)) = row else {
        return Ok(None);
    };

    let role = match role_text {
        Some(value) => Some(Role::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid role `{value}` in users.role"))
        })?),
        None => None,
    };

    Ok(Some(User {
        id: parse_uuid(&id_text, "users.id")?,
        username,
        email,
        password_hash,
        role,
        created_at,
    }))
}

fn load_patient(conn: &Connection, patient_id: PatientId) -> RepoResult<Option<PatientProfile>> {
    let mut stmt = conn.prepare(&format!("{PATIENT_SELECT_SQL} WHERE p.id = ?1;"))?;
    let mut rows = stmt.query([patient_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_patient_row(row)?)),
        None => Ok(None),
    }
}

fn load_doctor(conn: &Connection, doctor_id: DoctorId) -> RepoResult<Option<DoctorProfile>> {
    let mut stmt = conn.prepare(&format!("{DOCTOR_SELECT_SQL} WHERE d.id = ?1;"))?;
    let mut rows = stmt.query([doctor_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_doctor_row(row)?)),
        None => Ok(None),
    }
}

fn parse_user_summary(row: &Row<'_>) -> RepoResult<UserSummary> {
    let user_id_text: String = row.get("user_id")?;
    Ok(UserSummary {
        id: parse_uuid(&user_id_text, "users.id")?,
        username: row.get("username")?,
        email: row.get("email")?,
    })
}

fn parse_patient_row(row: &Row<'_>) -> RepoResult<PatientProfile> {
    let id_text: String = row.get("id")?;
    Ok(PatientProfile {
        id: parse_uuid(&id_text, "patients.id")?,
        user: parse_user_summary(row)?,
        date_of_birth: row.get("date_of_birth")?,
        phone_number: row.get("phone_number")?,
        address: row.get("address")?,
    })
}

fn parse_doctor_row(row: &Row<'_>) -> RepoResult<DoctorProfile> {
    let id_text: String = row.get("id")?;
    Ok(DoctorProfile {
        id: parse_uuid(&id_text, "doctors.id")?,
        user: parse_user_summary(row)?,
        specialization: row.get("specialization")?,
        license_number: row.get("license_number")?,
    })
}
