use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

use appointment_cell::models::AppointmentFilter;
use appointment_cell::services::records;
use patient_cell::models::PatientView;
use patient_cell::services::PatientService;

use crate::models::{AdminError, PatientRecord};

pub struct AdminRecordsService<'a> {
    conn: &'a Connection,
}

impl<'a> AdminRecordsService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// A patient profile with every appointment they ever had, newest first.
    pub fn patient_record(&self, patient_id: Uuid, today: NaiveDate) -> Result<PatientRecord, AdminError> {
        let patient = PatientService::new(self.conn).get_patient(patient_id)?;
        let filter = AppointmentFilter {
            patient_id: Some(patient_id),
            today: Some(today),
            ..AppointmentFilter::default()
        };
        let mut appointments = records::list_details(self.conn, &filter)?;
        records::attach_treatments(self.conn, &mut appointments)?;

        Ok(PatientRecord {
            patient: PatientView {
                age: patient.age_on(today),
                profile: patient,
            },
            appointments,
        })
    }
}
