use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use shared_models::auth::Principal;

use crate::models::{
    AppointmentDetails, AppointmentError, AppointmentFilter, AppointmentStatus, PatientHistory,
    VisitStatistics,
};
use crate::services::access::own_patient;
use crate::services::records;

/// Visit statistics over a patient's appointments, in any order.
pub fn visit_statistics(appointments: &[AppointmentDetails]) -> VisitStatistics {
    let dates = appointments.iter().map(|details| details.appointment.date);
    VisitStatistics {
        total_visits: appointments.len(),
        completed_visits: appointments
            .iter()
            .filter(|details| details.appointment.status == AppointmentStatus::Completed)
            .count(),
        total_treatments: appointments.iter().filter(|details| details.treatment.is_some()).count(),
        first_visit: dates.clone().min(),
        last_visit: dates.max(),
    }
}

pub struct TreatmentHistoryService<'a> {
    conn: &'a Connection,
}

impl<'a> TreatmentHistoryService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn history_of(&self, filter: AppointmentFilter) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let mut appointments = records::list_details(self.conn, &filter)?;
        records::attach_treatments(self.conn, &mut appointments)?;
        Ok(appointments)
    }

    /// The requesting patient's completed visits with their treatment records.
    pub fn own_treatments(&self, principal: &Principal) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let patient = own_patient(self.conn, principal)?;
        let treated = self.history_of(AppointmentFilter {
            patient_id: Some(patient.id),
            status: Some(AppointmentStatus::Completed),
            ..AppointmentFilter::default()
        })?;

        debug!("Patient {} has {} treatment records", patient.id, treated.len());
        Ok(treated)
    }

    /// Full history of one patient as seen by a doctor who has treated or
    /// is booked to see them. Admins may view any patient.
    pub fn patient_history(&self, principal: &Principal, patient_id: Uuid) -> Result<PatientHistory, AppointmentError> {
        let patient = records::find_patient(self.conn, patient_id)?.ok_or(AppointmentError::PatientNotFound)?;

        let mut filter = AppointmentFilter {
            patient_id: Some(patient.id),
            ..AppointmentFilter::default()
        };
        if principal.is_doctor() {
            let doctor = DoctorService::new(self.conn)
                .find_by_user(principal.id)?
                .ok_or(AppointmentError::DoctorNotFound)?;
            filter.doctor_id = Some(doctor.id);
        } else if !principal.is_admin() {
            return Err(AppointmentError::Forbidden("doctor access required".to_string()));
        }

        let appointments = self.history_of(filter)?;
        if principal.is_doctor() && appointments.is_empty() {
            warn!("Doctor {} requested history of unrelated patient {}", principal.id, patient_id);
            return Err(AppointmentError::Forbidden(
                "Access denied. You have no appointments with this patient".to_string(),
            ));
        }

        let statistics = visit_statistics(&appointments);
        Ok(PatientHistory {
            patient,
            appointments,
            statistics,
        })
    }
}
