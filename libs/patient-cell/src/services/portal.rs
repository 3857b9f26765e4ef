use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::models::{AppointmentFilter, AppointmentStatus, AppointmentView};
use appointment_cell::services::{records, TreatmentHistoryService};
use doctor_cell::models::{DoctorProfile, DoctorSearchFilters, DoctorWithNextDate, Slot};
use doctor_cell::services::{AvailabilityService, DepartmentService, DoctorService};
use shared_models::auth::Principal;

use crate::models::{
    DepartmentDetails, DoctorSearchQuery, DoctorSearchResult, PatientDashboard, PatientError,
};
use crate::services::patient::PatientService;

/// How far ahead "next available date" looks.
pub const NEXT_AVAILABLE_HORIZON_DAYS: u32 = 14;
const RECENT_TREATMENTS: usize = 5;

/// Read-mostly views a patient browses before and after booking.
pub struct PatientPortalService<'a> {
    conn: &'a Connection,
    slot_minutes: u32,
}

impl<'a> PatientPortalService<'a> {
    pub fn new(conn: &'a Connection, slot_minutes: u32) -> Self {
        Self { conn, slot_minutes }
    }

    fn with_next_date(&self, doctor: DoctorProfile, today: NaiveDate) -> Result<DoctorWithNextDate, PatientError> {
        let next_available_date = AvailabilityService::new(self.conn).next_available_date(
            doctor.id,
            today,
            NEXT_AVAILABLE_HORIZON_DAYS,
            self.slot_minutes,
        )?;
        Ok(DoctorWithNextDate {
            doctor,
            next_available_date,
        })
    }

    pub fn dashboard(&self, principal: &Principal, today: NaiveDate) -> Result<PatientDashboard, PatientError> {
        let patient = PatientService::new(self.conn).own_profile(principal)?;

        let departments = DepartmentService::new(self.conn).list_departments()?;
        let upcoming_appointments = records::list_details(
            self.conn,
            &AppointmentFilter {
                patient_id: Some(patient.id),
                status: Some(AppointmentStatus::Booked),
                view: AppointmentView::Upcoming,
                today: Some(today),
                ..AppointmentFilter::default()
            },
        )?;
        let mut recent_treatments = TreatmentHistoryService::new(self.conn).own_treatments(principal)?;
        recent_treatments.truncate(RECENT_TREATMENTS);

        let doctors = DoctorService::new(self.conn)
            .list_doctors(&DoctorSearchFilters::default())?
            .into_iter()
            .map(|doctor| self.with_next_date(doctor, today))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PatientDashboard {
            patient: patient.into(),
            departments,
            upcoming_appointments,
            recent_treatments,
            doctors,
        })
    }

    /// A department with its active doctors.
    pub fn department(&self, department_id: Uuid, today: NaiveDate) -> Result<DepartmentDetails, PatientError> {
        let department = DepartmentService::new(self.conn).get_department(department_id)?;
        let doctors = DoctorService::new(self.conn)
            .list_doctors(&DoctorSearchFilters {
                department_id: Some(department_id),
                ..DoctorSearchFilters::default()
            })?
            .into_iter()
            .map(|doctor| self.with_next_date(doctor, today))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DepartmentDetails { department, doctors })
    }

    /// Active doctors by department and name; with a date, only doctors
    /// with at least one free slot that day, and those slots.
    pub fn search_doctors(
        &self,
        query: DoctorSearchQuery,
        today: NaiveDate,
    ) -> Result<Vec<DoctorSearchResult>, PatientError> {
        if query.date.is_some_and(|date| date < today) {
            return Err(PatientError::Validation("Cannot search availability in the past".to_string()));
        }

        let doctors = DoctorService::new(self.conn).list_doctors(&DoctorSearchFilters {
            department_id: query.department_id,
            query: query.name,
            include_inactive: false,
        })?;

        let availability = AvailabilityService::new(self.conn);
        let mut results = Vec::with_capacity(doctors.len());
        for doctor in doctors {
            let slots = match query.date {
                Some(date) => {
                    let free = availability.available_slots(doctor.id, date, self.slot_minutes)?;
                    if free.is_empty() {
                        continue;
                    }
                    Some(free)
                }
                None => None,
            };
            let next_available_date = availability.next_available_date(
                doctor.id,
                today,
                NEXT_AVAILABLE_HORIZON_DAYS,
                self.slot_minutes,
            )?;
            results.push(DoctorSearchResult {
                doctor,
                next_available_date,
                slots,
            });
        }

        debug!("Doctor search returned {} results", results.len());
        Ok(results)
    }

    pub fn doctor(&self, doctor_id: Uuid, today: NaiveDate) -> Result<DoctorWithNextDate, PatientError> {
        let doctor = DoctorService::new(self.conn).get_active_doctor(doctor_id)?;
        self.with_next_date(doctor, today)
    }

    pub fn doctor_slots(&self, doctor_id: Uuid, date: NaiveDate, today: NaiveDate) -> Result<Vec<Slot>, PatientError> {
        if date < today {
            return Ok(Vec::new());
        }
        DoctorService::new(self.conn).get_active_doctor(doctor_id)?;
        Ok(AvailabilityService::new(self.conn).available_slots(doctor_id, date, self.slot_minutes)?)
    }
}
