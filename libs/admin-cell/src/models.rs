use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::{AppointmentDetails, AppointmentError};
use doctor_cell::models::{DoctorError, DoctorProfile};
use patient_cell::models::{PatientError, PatientView};
use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// DASHBOARD
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_doctors: i64,
    pub total_patients: i64,
    pub total_departments: i64,
    pub total_appointments: usize,
    pub upcoming_appointments: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub recent_appointments: Vec<AppointmentDetails>,
    pub upcoming_appointments: Vec<AppointmentDetails>,
}

// ==============================================================================
// RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PatientRecord {
    #[serde(flatten)]
    pub patient: PatientView,
    pub appointments: Vec<AppointmentDetails>,
}

/// What the deletion procedure removed, in the order it removed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub account_id: Uuid,
    pub profile_id: Uuid,
    pub treatments_removed: usize,
    pub appointments_removed: usize,
}

// ==============================================================================
// SEARCH
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    All,
    Doctors,
    Patients,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type", default)]
    pub search_type: SearchType,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub doctors: Vec<DoctorProfile>,
    pub patients: Vec<PatientView>,
}

/// Admin listings include blacklisted accounts unless asked otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminListQuery {
    pub q: Option<String>,
    pub department_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub include_inactive: bool,
}

fn default_true() -> bool {
    true
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Admin accounts cannot be deleted")]
    AdminAccountProtected,

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for AdminError {
    fn from(err: rusqlite::Error) -> Self {
        AdminError::Database(err.into())
    }
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::AccountNotFound => AppError::NotFound(err.to_string()),
            AdminError::AdminAccountProtected => AppError::Forbidden(err.to_string()),
            AdminError::Doctor(e) => e.into(),
            AdminError::Patient(e) => e.into(),
            AdminError::Appointment(e) => e.into(),
            AdminError::Database(e) => e.into(),
        }
    }
}
