use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{AvailabilityError, DoctorError, DoctorProfile, Slot};
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::time_format::{hhmm, hhmm_option};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "Booked",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed and Cancelled are terminal.
    pub fn is_closed(&self) -> bool {
        !matches!(self, AppointmentStatus::Booked)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "booked" => Ok(AppointmentStatus::Booked),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot(&self) -> Result<Slot, AvailabilityError> {
        Slot::new(self.date, self.start_time, self.end_time)
    }
}

/// The clinical note attached to a completed appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub visit_type: String,
    pub tests_done: Option<String>,
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub medicines: Option<String>,
    pub follow_up_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An appointment joined with the names a dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub patient_user_id: Uuid,
    pub doctor_name: String,
    pub doctor_user_id: Uuid,
    pub department_name: String,
    pub treatment: Option<TreatmentRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub is_active: bool,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Defaults to `start_time` plus the configured slot length.
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
    pub notes: Option<String>,
    /// Only honoured when an admin books on a patient's behalf.
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentInput {
    pub visit_type: Option<String>,
    pub tests_done: Option<String>,
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub medicines: Option<String>,
    pub follow_up_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheckResponse {
    pub slot: Slot,
    pub within_availability: bool,
    pub has_conflict: bool,
    /// Times already taken. Never whose appointment it is.
    pub conflicting_slots: Vec<Slot>,
    pub suggested_alternatives: Vec<Slot>,
}

impl ConflictCheckResponse {
    pub fn is_bookable(&self) -> bool {
        self.within_availability && !self.has_conflict
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentView {
    Upcoming,
    Past,
    #[default]
    All,
}

/// Query-string filters shared by the appointment list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub view: Option<AppointmentView>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub view: AppointmentView,
    pub today: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl AppointmentFilter {
    pub fn from_query(query: AppointmentListQuery, today: NaiveDate) -> Result<Self, AppointmentError> {
        let status = match query.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse().map_err(AppointmentError::Validation)?),
        };
        Ok(Self {
            status,
            date: query.date,
            view: query.view.unwrap_or_default(),
            today: Some(today),
            ..Self::default()
        })
    }
}

// ==============================================================================
// DOCTOR DESK MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VisitStatistics {
    pub total_visits: usize,
    pub completed_visits: usize,
    pub total_treatments: usize,
    pub first_visit: Option<NaiveDate>,
    pub last_visit: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboardStats {
    pub today_count: usize,
    pub week_count: usize,
    pub patient_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub doctor: DoctorProfile,
    pub today_appointments: Vec<AppointmentDetails>,
    pub upcoming_appointments: Vec<AppointmentDetails>,
    pub assigned_patients: Vec<PatientSummary>,
    pub stats: DoctorDashboardStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientHistory {
    pub patient: PatientSummary,
    pub appointments: Vec<AppointmentDetails>,
    pub statistics: VisitStatistics,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is not accepting appointments")]
    DoctorUnavailable,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Requested slot {0} is outside the doctor's availability")]
    OutsideAvailability(Slot),

    #[error("Requested slot {slot} conflicts with booked appointment(s) at {conflicts}")]
    SlotConflict { slot: Slot, conflicts: String },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Only booked appointments can be changed; this one is {0}")]
    Closed(AppointmentStatus),

    #[error("Completed appointments are permanent medical records")]
    PermanentRecord,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for AppointmentError {
    fn from(err: rusqlite::Error) -> Self {
        AppointmentError::Database(err.into())
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::Availability(e) => AppointmentError::Availability(e),
            DoctorError::Database(e) => AppointmentError::Database(e),
            DoctorError::Forbidden(msg) => AppointmentError::Forbidden(msg),
            other => AppointmentError::Validation(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotConflict { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::DoctorUnavailable
            | AppointmentError::InvalidTime(_)
            | AppointmentError::OutsideAvailability(_)
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::Closed(_)
            | AppointmentError::PermanentRecord
            | AppointmentError::Validation(_)
            | AppointmentError::Availability(_) => AppError::ValidationError(err.to_string()),
            // The storage backstop fired: another request took the slot first.
            AppointmentError::Database(e) if e.constraint_message() == Some("booked slot overlap") => {
                AppError::Conflict("Requested slot was just booked by someone else".to_string())
            }
            AppointmentError::Database(e) if e.constraint_message() == Some("appointment is closed") => {
                AppError::ValidationError("Only booked appointments can be changed".to_string())
            }
            AppointmentError::Database(e) => e.into(),
        }
    }
}
