use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::{AppointmentDetails, AppointmentError};
use doctor_cell::models::{Department, DepartmentOverview, DoctorError, DoctorProfile, DoctorWithNextDate, Slot};
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::password::PasswordError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub is_active: bool,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientProfile {
    pub fn age(&self) -> Option<u32> {
        self.age_on(Utc::now().date_naive())
    }

    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|born| today.years_since(born))
    }
}

/// A profile as returned to clients, with the derived age.
#[derive(Debug, Clone, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub profile: PatientProfile,
    pub age: Option<u32>,
}

impl From<PatientProfile> for PatientView {
    fn from(profile: PatientProfile) -> Self {
        let age = profile.age();
        Self { profile, age }
    }
}

/// What patients may change about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOwnProfileRequest {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    /// A new login password; left unchanged when absent or empty.
    pub password: Option<String>,
}

/// Admin edit of a patient record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearchQuery {
    /// Matches name, email, contact or profile id.
    pub query: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Doctor search from the patient side. With `date`, each result carries
/// the doctor's free slots that day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub department_id: Option<Uuid>,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSearchResult {
    #[serde(flatten)]
    pub doctor: DoctorProfile,
    pub next_available_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<Slot>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentDetails {
    #[serde(flatten)]
    pub department: Department,
    pub doctors: Vec<DoctorWithNextDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub patient: PatientView,
    pub departments: Vec<DepartmentOverview>,
    pub upcoming_appointments: Vec<AppointmentDetails>,
    pub recent_treatments: Vec<AppointmentDetails>,
    pub doctors: Vec<DoctorWithNextDate>,
}

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid date of birth")]
    InvalidDateOfBirth,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for PatientError {
    fn from(err: rusqlite::Error) -> Self {
        PatientError::Database(err.into())
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::EmailTaken => AppError::Conflict(err.to_string()),
            PatientError::Forbidden(msg) => AppError::Forbidden(msg),
            PatientError::InvalidDateOfBirth => AppError::ValidationError(err.to_string()),
            PatientError::Validation(msg) => AppError::ValidationError(msg),
            PatientError::Password(e) => e.into(),
            PatientError::Doctor(e) => e.into(),
            PatientError::Appointment(e) => e.into(),
            PatientError::Database(e) => e.into(),
        }
    }
}
