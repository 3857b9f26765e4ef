use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Type, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::accounts::{self, AccountChanges, NewAccount};
use shared_database::{timestamp_column, timestamp_param, uuid_column, DatabaseError};
use shared_models::auth::{Principal, Role};
use shared_utils::password::PasswordService;
use shared_utils::validation::is_valid_email;

use crate::models::{
    CreateDoctorRequest, DoctorError, DoctorProfile, DoctorSearchFilters, UpdateDoctorRequest,
    UpdateOwnProfileRequest, WeeklyAvailability,
};
use crate::services::department::DepartmentService;

const DOCTOR_SELECT: &str = "SELECT p.id, p.user_id, u.name, u.email, u.contact, u.is_active,
        p.department_id, d.name, p.specialization, p.experience_years, p.availability,
        p.created_at, p.updated_at
     FROM doctor_profiles p
     JOIN users u ON u.id = p.user_id
     JOIN departments d ON d.id = p.department_id";

fn map_doctor(row: &Row<'_>) -> rusqlite::Result<DoctorProfile> {
    let raw_availability: String = row.get(10)?;
    let availability = serde_json::from_str::<WeeklyAvailability>(&raw_availability)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(DoctorProfile {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        contact: row.get(4)?,
        is_active: row.get(5)?,
        department_id: uuid_column(row, 6)?,
        department_name: row.get(7)?,
        specialization: row.get(8)?,
        experience_years: row.get(9)?,
        availability,
        created_at: timestamp_column(row, 11)?,
        updated_at: timestamp_column(row, 12)?,
    })
}

pub(crate) fn availability_param(availability: &WeeklyAvailability) -> Result<String, DoctorError> {
    serde_json::to_string(availability).map_err(|e| {
        DoctorError::Database(DatabaseError::InvalidValue {
            field: "availability".to_string(),
            value: e.to_string(),
        })
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_experience(years: i64) -> Result<i64, DoctorError> {
    if !(0..=80).contains(&years) {
        return Err(DoctorError::Validation("Experience must be between 0 and 80 years".to_string()));
    }
    Ok(years)
}

pub struct DoctorService<'a> {
    conn: &'a Connection,
}

impl<'a> DoctorService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create the doctor's login account and profile together.
    pub fn create_doctor(&self, request: CreateDoctorRequest) -> Result<DoctorProfile, DoctorError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DoctorError::Validation("Name is required".to_string()));
        }
        if !is_valid_email(&request.email) {
            return Err(DoctorError::Validation("A valid email is required".to_string()));
        }
        if accounts::email_taken(self.conn, &request.email, None)? {
            return Err(DoctorError::EmailTaken);
        }
        DepartmentService::new(self.conn).get_department(request.department_id)?;
        let experience_years = validate_experience(request.experience_years.unwrap_or(0))?;
        let availability = request
            .availability
            .unwrap_or_else(WeeklyAvailability::default_schedule);

        let account = accounts::insert_account(
            self.conn,
            NewAccount {
                name,
                email: request.email,
                password_hash: PasswordService::hash_new_password(&request.password)?,
                role: Role::Doctor,
                contact: request.contact,
            },
        )?;

        let profile_id = Uuid::new_v4();
        let now = timestamp_param(Utc::now());
        self.conn.execute(
            "INSERT INTO doctor_profiles
                (id, user_id, department_id, specialization, experience_years, availability, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                profile_id.to_string(),
                account.id.to_string(),
                request.department_id.to_string(),
                clean(request.specialization),
                experience_years,
                availability_param(&availability)?,
                now,
            ],
        )?;

        info!("Created doctor {} with account {}", profile_id, account.id);
        self.get_doctor(profile_id)
    }

    pub fn find_doctor(&self, id: Uuid) -> Result<Option<DoctorProfile>, DoctorError> {
        let doctor = self
            .conn
            .query_row(
                &format!("{} WHERE p.id = ?1", DOCTOR_SELECT),
                params![id.to_string()],
                map_doctor,
            )
            .optional()?;
        Ok(doctor)
    }

    pub fn get_doctor(&self, id: Uuid) -> Result<DoctorProfile, DoctorError> {
        self.find_doctor(id)?.ok_or(DoctorError::NotFound)
    }

    /// A doctor visible to patients: the account must be active.
    pub fn get_active_doctor(&self, id: Uuid) -> Result<DoctorProfile, DoctorError> {
        match self.get_doctor(id)? {
            doctor if doctor.is_active => Ok(doctor),
            _ => Err(DoctorError::NotFound),
        }
    }

    pub fn find_by_user(&self, user_id: Uuid) -> Result<Option<DoctorProfile>, DoctorError> {
        let doctor = self
            .conn
            .query_row(
                &format!("{} WHERE p.user_id = ?1", DOCTOR_SELECT),
                params![user_id.to_string()],
                map_doctor,
            )
            .optional()?;
        Ok(doctor)
    }

    /// The profile of the doctor making the request.
    pub fn own_profile(&self, principal: &Principal) -> Result<DoctorProfile, DoctorError> {
        if !principal.is_doctor() {
            return Err(DoctorError::Forbidden("Doctor access required".to_string()));
        }
        self.find_by_user(principal.id)?.ok_or(DoctorError::NotFound)
    }

    pub fn list_doctors(&self, filters: &DoctorSearchFilters) -> Result<Vec<DoctorProfile>, DoctorError> {
        let mut sql = format!("{} WHERE 1 = 1", DOCTOR_SELECT);
        let mut args: Vec<String> = Vec::new();

        if !filters.include_inactive {
            sql.push_str(" AND u.is_active = 1");
        }
        if let Some(department_id) = filters.department_id {
            args.push(department_id.to_string());
            sql.push_str(&format!(" AND p.department_id = ?{}", args.len()));
        }
        if let Some(query) = filters.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            args.push(format!("%{}%", query));
            let n = args.len();
            sql.push_str(&format!(" AND (u.name LIKE ?{n} OR d.name LIKE ?{n} OR p.specialization LIKE ?{n})"));
        }
        sql.push_str(" ORDER BY u.name");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), map_doctor)?;
        let doctors = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Doctor search matched {} doctors", doctors.len());
        Ok(doctors)
    }

    pub fn update_doctor(&self, id: Uuid, request: UpdateDoctorRequest) -> Result<DoctorProfile, DoctorError> {
        let doctor = self.get_doctor(id)?;

        if let Some(email) = request.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !is_valid_email(email) {
                return Err(DoctorError::Validation("A valid email is required".to_string()));
            }
            if accounts::email_taken(self.conn, email, Some(doctor.user_id))? {
                return Err(DoctorError::EmailTaken);
            }
        }
        if let Some(department_id) = request.department_id {
            DepartmentService::new(self.conn).get_department(department_id)?;
        }
        let password_hash = match request.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => Some(PasswordService::hash_new_password(password)?),
            None => None,
        };

        accounts::update_account(
            self.conn,
            doctor.user_id,
            AccountChanges {
                name: request.name,
                email: request.email,
                contact: request.contact,
                password_hash,
            },
        )?;

        self.update_profile_fields(
            &doctor,
            request.department_id,
            request.specialization,
            request.experience_years,
        )?;

        info!("Updated doctor {}", id);
        self.get_doctor(id)
    }

    pub fn update_own_profile(
        &self,
        principal: &Principal,
        request: UpdateOwnProfileRequest,
    ) -> Result<DoctorProfile, DoctorError> {
        let doctor = self.own_profile(principal)?;

        accounts::update_account(
            self.conn,
            doctor.user_id,
            AccountChanges {
                name: request.name,
                contact: request.contact,
                ..AccountChanges::default()
            },
        )?;
        self.update_profile_fields(&doctor, None, request.specialization, request.experience_years)?;

        info!("Doctor {} updated their profile", doctor.id);
        self.get_doctor(doctor.id)
    }

    fn update_profile_fields(
        &self,
        doctor: &DoctorProfile,
        department_id: Option<Uuid>,
        specialization: Option<String>,
        experience_years: Option<i64>,
    ) -> Result<(), DoctorError> {
        let specialization = match specialization {
            Some(value) => clean(Some(value)),
            None => doctor.specialization.clone(),
        };
        let experience_years = match experience_years {
            Some(years) => validate_experience(years)?,
            None => doctor.experience_years,
        };

        self.conn.execute(
            "UPDATE doctor_profiles
             SET department_id = ?2, specialization = ?3, experience_years = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                doctor.id.to_string(),
                department_id.unwrap_or(doctor.department_id).to_string(),
                specialization,
                experience_years,
                timestamp_param(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Blacklisting: an inactive doctor cannot log in and is hidden from patients.
    pub fn set_doctor_active(&self, id: Uuid, is_active: bool) -> Result<DoctorProfile, DoctorError> {
        let doctor = self.get_doctor(id)?;
        accounts::set_account_active(self.conn, doctor.user_id, is_active)?;

        if is_active {
            info!("Reactivated doctor {}", id);
        } else {
            warn!("Blacklisted doctor {}", id);
        }
        self.get_doctor(id)
    }

    /// Remove only the profile row; appointments must already be gone.
    pub fn delete_profile_row(&self, id: Uuid) -> Result<(), DoctorError> {
        let changed = self
            .conn
            .execute("DELETE FROM doctor_profiles WHERE id = ?1", params![id.to_string()])?;
        if changed == 0 {
            return Err(DoctorError::NotFound);
        }
        Ok(())
    }
}
