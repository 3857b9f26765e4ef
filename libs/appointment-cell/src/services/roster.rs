use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use tracing::debug;

use doctor_cell::services::DoctorService;
use shared_models::auth::Principal;

use crate::models::{
    AppointmentError, AppointmentFilter, AppointmentStatus, AppointmentView, DoctorDashboard,
    DoctorDashboardStats, PatientSummary,
};
use crate::services::records;

const UPCOMING_WINDOW_DAYS: u64 = 7;

/// The doctor's own working view: today's list, the coming week, and patients.
pub struct DoctorRosterService<'a> {
    conn: &'a Connection,
}

impl<'a> DoctorRosterService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn dashboard(&self, principal: &Principal, today: NaiveDate) -> Result<DoctorDashboard, AppointmentError> {
        let doctor = DoctorService::new(self.conn).own_profile(principal)?;

        let booked = records::list_details(
            self.conn,
            &AppointmentFilter {
                doctor_id: Some(doctor.id),
                status: Some(AppointmentStatus::Booked),
                view: AppointmentView::Upcoming,
                today: Some(today),
                ..AppointmentFilter::default()
            },
        )?;
        let week_end = today
            .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MAX);

        let (today_appointments, later): (Vec<_>, Vec<_>) = booked
            .into_iter()
            .filter(|details| details.appointment.date <= week_end)
            .partition(|details| details.appointment.date == today);
        let upcoming_appointments = later;

        let assigned_patients = records::patients_of_doctor(self.conn, doctor.id)?;
        let completed_count = records::count_appointments(
            self.conn,
            &AppointmentFilter {
                doctor_id: Some(doctor.id),
                status: Some(AppointmentStatus::Completed),
                ..AppointmentFilter::default()
            },
        )?;

        let stats = DoctorDashboardStats {
            today_count: today_appointments.len(),
            week_count: upcoming_appointments.len(),
            patient_count: assigned_patients.len(),
            completed_count,
        };
        debug!(
            "Dashboard for doctor {}: {} today, {} this week",
            doctor.id, stats.today_count, stats.week_count
        );

        Ok(DoctorDashboard {
            doctor,
            today_appointments,
            upcoming_appointments,
            assigned_patients,
            stats,
        })
    }

    /// Patients with at least one appointment with the requesting doctor.
    pub fn assigned_patients(&self, principal: &Principal) -> Result<Vec<PatientSummary>, AppointmentError> {
        let doctor = DoctorService::new(self.conn).own_profile(principal)?;
        records::patients_of_doctor(self.conn, doctor.id)
    }
}
