use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::accounts::{self, AccountChanges, NewAccount};
use shared_database::{date_param, optional_date_column, timestamp_column, timestamp_param, uuid_column};
use shared_models::auth::{Principal, Role, UserAccount};
use shared_utils::password::PasswordService;
use shared_utils::validation::is_valid_email;

use crate::models::{
    PatientError, PatientProfile, PatientSearchQuery, UpdateOwnProfileRequest, UpdatePatientRequest,
};

const PATIENT_SELECT: &str = "SELECT p.id, p.user_id, u.name, u.email, COALESCE(p.contact, u.contact),
        u.is_active, p.date_of_birth, p.gender, p.address, p.created_at, p.updated_at
     FROM patient_profiles p
     JOIN users u ON u.id = p.user_id";

fn map_patient(row: &Row<'_>) -> rusqlite::Result<PatientProfile> {
    Ok(PatientProfile {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        contact: row.get(4)?,
        is_active: row.get(5)?,
        date_of_birth: optional_date_column(row, 6)?,
        gender: row.get(7)?,
        address: row.get(8)?,
        created_at: timestamp_column(row, 9)?,
        updated_at: timestamp_column(row, 10)?,
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Profile-level changes shared by the patient and admin edit paths.
struct ProfileChanges {
    contact: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    address: Option<String>,
}

pub struct PatientService<'a> {
    conn: &'a Connection,
}

impl<'a> PatientService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Self-registration: a patient account with an empty profile.
    pub fn register_patient(
        &self,
        name: &str,
        email: &str,
        password: &str,
        contact: Option<String>,
    ) -> Result<(UserAccount, PatientProfile), PatientError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PatientError::Validation("Name is required".to_string()));
        }
        if accounts::email_taken(self.conn, email, None)? {
            warn!("Registration attempted with an existing email");
            return Err(PatientError::EmailTaken);
        }

        let account = accounts::insert_account(
            self.conn,
            NewAccount {
                name,
                email: email.to_string(),
                password_hash: PasswordService::hash_new_password(password)?,
                role: Role::Patient,
                contact: clean(contact),
            },
        )?;
        let profile = self.create_empty_profile(account.id)?;

        info!("Registered patient {} with account {}", profile.id, account.id);
        Ok((account, profile))
    }

    pub fn create_empty_profile(&self, user_id: Uuid) -> Result<PatientProfile, PatientError> {
        let id = Uuid::new_v4();
        let now = timestamp_param(Utc::now());
        self.conn.execute(
            "INSERT INTO patient_profiles (id, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id.to_string(), user_id.to_string(), now],
        )?;
        self.get_patient(id)
    }

    pub fn find_patient(&self, id: Uuid) -> Result<Option<PatientProfile>, PatientError> {
        let patient = self
            .conn
            .query_row(
                &format!("{} WHERE p.id = ?1", PATIENT_SELECT),
                params![id.to_string()],
                map_patient,
            )
            .optional()?;
        Ok(patient)
    }

    pub fn get_patient(&self, id: Uuid) -> Result<PatientProfile, PatientError> {
        self.find_patient(id)?.ok_or(PatientError::NotFound)
    }

    pub fn find_by_user(&self, user_id: Uuid) -> Result<Option<PatientProfile>, PatientError> {
        let patient = self
            .conn
            .query_row(
                &format!("{} WHERE p.user_id = ?1", PATIENT_SELECT),
                params![user_id.to_string()],
                map_patient,
            )
            .optional()?;
        Ok(patient)
    }

    pub fn own_profile(&self, principal: &Principal) -> Result<PatientProfile, PatientError> {
        if !principal.is_patient() {
            return Err(PatientError::Forbidden("patient access required".to_string()));
        }
        self.find_by_user(principal.id)?.ok_or(PatientError::NotFound)
    }

    pub fn list_patients(&self, query: &PatientSearchQuery) -> Result<Vec<PatientProfile>, PatientError> {
        let mut sql = format!("{} WHERE 1 = 1", PATIENT_SELECT);
        let mut args: Vec<String> = Vec::new();

        if !query.include_inactive {
            sql.push_str(" AND u.is_active = 1");
        }
        if let Some(term) = query.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            args.push(format!("%{}%", term));
            let n = args.len();
            sql.push_str(&format!(
                " AND (u.name LIKE ?{n} OR u.email LIKE ?{n} OR COALESCE(p.contact, u.contact) LIKE ?{n} OR p.id LIKE ?{n})"
            ));
        }
        sql.push_str(" ORDER BY u.name");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), map_patient)?;
        let patients = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Patient search matched {} patients", patients.len());
        Ok(patients)
    }

    pub fn update_own_profile(
        &self,
        principal: &Principal,
        request: UpdateOwnProfileRequest,
    ) -> Result<PatientProfile, PatientError> {
        let patient = self.own_profile(principal)?;

        let password_hash = match request.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => Some(PasswordService::hash_new_password(password)?),
            None => None,
        };
        accounts::update_account(
            self.conn,
            patient.user_id,
            AccountChanges {
                name: request.name,
                contact: request.contact.clone(),
                password_hash,
                ..AccountChanges::default()
            },
        )?;
        self.update_profile_fields(
            &patient,
            ProfileChanges {
                contact: request.contact,
                date_of_birth: request.date_of_birth,
                gender: request.gender,
                address: request.address,
            },
        )?;

        info!("Patient {} updated their profile", patient.id);
        self.get_patient(patient.id)
    }

    pub fn update_patient(&self, id: Uuid, request: UpdatePatientRequest) -> Result<PatientProfile, PatientError> {
        let patient = self.get_patient(id)?;

        if let Some(email) = request.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !is_valid_email(email) {
                return Err(PatientError::Validation("A valid email is required".to_string()));
            }
            if accounts::email_taken(self.conn, email, Some(patient.user_id))? {
                return Err(PatientError::EmailTaken);
            }
        }
        accounts::update_account(
            self.conn,
            patient.user_id,
            AccountChanges {
                name: request.name,
                email: request.email,
                contact: request.contact.clone(),
                password_hash: None,
            },
        )?;
        self.update_profile_fields(
            &patient,
            ProfileChanges {
                contact: request.contact,
                date_of_birth: request.date_of_birth,
                gender: request.gender,
                address: request.address,
            },
        )?;

        info!("Updated patient {}", id);
        self.get_patient(id)
    }

    fn update_profile_fields(&self, patient: &PatientProfile, changes: ProfileChanges) -> Result<(), PatientError> {
        if let Some(born) = changes.date_of_birth {
            if born > Utc::now().date_naive() {
                return Err(PatientError::InvalidDateOfBirth);
            }
        }
        let keep_or = |new: Option<String>, old: &Option<String>| match new {
            Some(value) => clean(Some(value)),
            None => old.clone(),
        };

        self.conn.execute(
            "UPDATE patient_profiles
             SET contact = ?2, date_of_birth = ?3, gender = ?4, address = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                patient.id.to_string(),
                keep_or(changes.contact, &patient.contact),
                changes.date_of_birth.or(patient.date_of_birth).map(date_param),
                keep_or(changes.gender, &patient.gender),
                keep_or(changes.address, &patient.address),
                timestamp_param(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Blacklisting: an inactive patient cannot log in.
    pub fn set_patient_active(&self, id: Uuid, is_active: bool) -> Result<PatientProfile, PatientError> {
        let patient = self.get_patient(id)?;
        accounts::set_account_active(self.conn, patient.user_id, is_active)?;

        if is_active {
            info!("Reactivated patient {}", id);
        } else {
            warn!("Blacklisted patient {}", id);
        }
        self.get_patient(id)
    }

    /// Remove only the profile row; appointments must already be gone.
    pub fn delete_profile_row(&self, id: Uuid) -> Result<(), PatientError> {
        let changed = self
            .conn
            .execute("DELETE FROM patient_profiles WHERE id = ?1", params![id.to_string()])?;
        if changed == 0 {
            return Err(PatientError::NotFound);
        }
        Ok(())
    }
}
