//! Who may act on an appointment, decided from the explicit `Principal`.

use rusqlite::Connection;
use tracing::warn;
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use shared_models::auth::{Principal, Role};

use crate::models::{Appointment, AppointmentError, PatientSummary};
use crate::services::records;

/// A principal resolved to the profile it acts through.
#[derive(Debug, Clone)]
pub enum Actor {
    Admin,
    Doctor { doctor_id: Uuid },
    Patient { patient_id: Uuid },
}

impl Actor {
    pub fn resolve(conn: &Connection, principal: &Principal) -> Result<Self, AppointmentError> {
        match principal.role {
            Role::Admin => Ok(Actor::Admin),
            Role::Doctor => {
                let doctor = DoctorService::new(conn)
                    .find_by_user(principal.id)?
                    .ok_or(AppointmentError::DoctorNotFound)?;
                Ok(Actor::Doctor { doctor_id: doctor.id })
            }
            Role::Patient => {
                let patient = own_patient(conn, principal)?;
                Ok(Actor::Patient { patient_id: patient.id })
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }

    fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            Actor::Admin => false,
            Actor::Doctor { doctor_id } => appointment.doctor_id == *doctor_id,
            Actor::Patient { patient_id } => appointment.patient_id == *patient_id,
        }
    }

    pub fn ensure_can_view(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        if self.is_admin() || self.owns(appointment) {
            return Ok(());
        }
        Err(not_yours(appointment))
    }

    /// Patients reschedule their own visits; doctors do not move them.
    pub fn ensure_can_reschedule(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        match self {
            Actor::Admin => Ok(()),
            Actor::Patient { .. } if self.owns(appointment) => Ok(()),
            Actor::Doctor { .. } => {
                warn!("Doctor attempted to reschedule appointment {}", appointment.id);
                Err(AppointmentError::Forbidden(
                    "Doctors cannot reschedule appointments".to_string(),
                ))
            }
            Actor::Patient { .. } => Err(not_yours(appointment)),
        }
    }

    pub fn ensure_can_cancel(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        self.ensure_can_view(appointment)
    }

    /// Only the treating doctor (or an admin) records the treatment.
    pub fn ensure_can_complete(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        match self {
            Actor::Admin => Ok(()),
            Actor::Doctor { .. } if self.owns(appointment) => Ok(()),
            Actor::Doctor { .. } => Err(not_yours(appointment)),
            Actor::Patient { .. } => Err(AppointmentError::Forbidden(
                "Patients cannot complete appointments".to_string(),
            )),
        }
    }
}

fn not_yours(appointment: &Appointment) -> AppointmentError {
    warn!("Access denied to appointment {}", appointment.id);
    AppointmentError::Forbidden("Access denied. This appointment does not belong to you".to_string())
}

/// The patient profile behind a patient principal.
pub fn own_patient(conn: &Connection, principal: &Principal) -> Result<PatientSummary, AppointmentError> {
    if !principal.is_patient() {
        return Err(AppointmentError::Forbidden("patient access required".to_string()));
    }
    records::find_patient_by_user(conn, principal.id)?.ok_or(AppointmentError::PatientNotFound)
}
