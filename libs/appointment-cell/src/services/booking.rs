use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{DoctorProfile, Slot};
use doctor_cell::services::DoctorService;
use shared_models::auth::Principal;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentFilter, AppointmentStatus,
    BookAppointmentRequest, CancelAppointmentRequest, ConflictCheckRequest, ConflictCheckResponse,
    RescheduleAppointmentRequest, TreatmentInput, TreatmentRecord,
};
use crate::services::access::Actor;
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::records;

const DEFAULT_VISIT_TYPE: &str = "In-person";

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct AppointmentBookingService<'a> {
    conn: &'a Connection,
    default_slot_minutes: u32,
    conflict_service: ConflictDetectionService<'a>,
    lifecycle_service: AppointmentLifecycleService,
}

impl<'a> AppointmentBookingService<'a> {
    pub fn new(conn: &'a Connection, default_slot_minutes: u32) -> Self {
        Self {
            conn,
            default_slot_minutes,
            conflict_service: ConflictDetectionService::new(conn),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    /// Build the requested slot, defaulting the end time to the configured length.
    pub fn requested_slot(
        &self,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: Option<NaiveTime>,
    ) -> Result<Slot, AppointmentError> {
        let slot = match end_time {
            Some(end_time) => Slot::new(date, start_time, end_time),
            None => Slot::starting_at(date, start_time, self.default_slot_minutes),
        };
        slot.map_err(|e| AppointmentError::InvalidTime(e.to_string()))
    }

    fn ensure_not_past(&self, date: NaiveDate, today: NaiveDate) -> Result<(), AppointmentError> {
        if date < today {
            return Err(AppointmentError::InvalidTime(
                "Cannot book appointments in the past".to_string(),
            ));
        }
        Ok(())
    }

    fn bookable_doctor(&self, doctor_id: Uuid) -> Result<DoctorProfile, AppointmentError> {
        let doctor = DoctorService::new(self.conn).get_doctor(doctor_id)?;
        if !doctor.is_active {
            warn!("Booking attempted with inactive doctor {}", doctor_id);
            return Err(AppointmentError::DoctorUnavailable);
        }
        Ok(doctor)
    }

    /// Book a new appointment. Patients book for themselves; admins book on
    /// behalf of the patient named in the request.
    pub fn book_appointment(
        &self,
        principal: &Principal,
        request: BookAppointmentRequest,
        today: NaiveDate,
    ) -> Result<AppointmentDetails, AppointmentError> {
        info!("Booking appointment with doctor {} on {}", request.doctor_id, request.date);

        let patient_id = match Actor::resolve(self.conn, principal)? {
            Actor::Patient { patient_id } => patient_id,
            Actor::Admin => request.patient_id.ok_or_else(|| {
                AppointmentError::Validation("patient_id is required when booking for a patient".to_string())
            })?,
            Actor::Doctor { .. } => {
                return Err(AppointmentError::Forbidden(
                    "Doctors cannot book appointments".to_string(),
                ))
            }
        };
        let patient = records::find_patient(self.conn, patient_id)?.ok_or(AppointmentError::PatientNotFound)?;
        if !patient.is_active {
            return Err(AppointmentError::Validation("Patient account is inactive".to_string()));
        }

        self.ensure_not_past(request.date, today)?;
        let slot = self.requested_slot(request.date, request.start_time, request.end_time)?;
        let doctor = self.bookable_doctor(request.doctor_id)?;
        self.conflict_service.ensure_bookable(&doctor, &slot, None)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: doctor.id,
            date: slot.date(),
            start_time: slot.start_time(),
            end_time: slot.end_time(),
            status: AppointmentStatus::Booked,
            notes: clean(request.notes),
            created_at: now,
            updated_at: now,
        };
        records::insert_appointment(self.conn, &appointment)?;

        info!("Appointment {} booked with doctor {} at {}", appointment.id, doctor.id, slot);
        records::get_details(self.conn, appointment.id)
    }

    /// Move a Booked appointment to a new slot. The appointment keeps its
    /// length unless an end time is given.
    pub fn reschedule_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        today: NaiveDate,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let current = records::get_appointment(self.conn, appointment_id)?;
        Actor::resolve(self.conn, principal)?.ensure_can_reschedule(&current)?;
        self.lifecycle_service.ensure_reschedulable(&current.status)?;
        self.ensure_not_past(request.date, today)?;

        let slot = match request.end_time {
            Some(_) => self.requested_slot(request.date, request.start_time, request.end_time)?,
            None => Slot::starting_at(request.date, request.start_time, current.slot()?.range().minutes())
                .map_err(|e| AppointmentError::InvalidTime(e.to_string()))?,
        };
        let doctor = self.bookable_doctor(current.doctor_id)?;
        self.conflict_service.ensure_bookable(&doctor, &slot, Some(appointment_id))?;

        records::update_slot(self.conn, appointment_id, slot.date(), slot.start_time(), slot.end_time())?;

        info!("Appointment {} rescheduled to {}", appointment_id, slot);
        records::get_details(self.conn, appointment_id)
    }

    pub fn cancel_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = records::get_appointment(self.conn, appointment_id)?;
        Actor::resolve(self.conn, principal)?.ensure_can_cancel(&current)?;
        self.lifecycle_service
            .validate_status_transition(&current.status, &AppointmentStatus::Cancelled)?;

        let note = clean(request.reason).map(|reason| format!("Cancelled by {}: {}", principal.role, reason));
        records::update_status(self.conn, appointment_id, AppointmentStatus::Cancelled, note.as_deref())?;

        info!("Appointment {} cancelled by {}", appointment_id, principal.role);
        records::get_details(self.conn, appointment_id)
    }

    /// Complete a Booked appointment and attach its treatment record.
    /// Both writes share the caller's transaction.
    pub fn complete_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
        treatment: TreatmentInput,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Completing appointment: {}", appointment_id);

        let current = records::get_appointment(self.conn, appointment_id)?;
        Actor::resolve(self.conn, principal)?.ensure_can_complete(&current)?;
        self.lifecycle_service
            .validate_status_transition(&current.status, &AppointmentStatus::Completed)?;

        let diagnosis = treatment.diagnosis.trim().to_string();
        if diagnosis.is_empty() {
            return Err(AppointmentError::Validation("Diagnosis is required".to_string()));
        }

        records::update_status(self.conn, appointment_id, AppointmentStatus::Completed, None)?;
        let record = TreatmentRecord {
            id: Uuid::new_v4(),
            appointment_id,
            visit_type: clean(treatment.visit_type).unwrap_or_else(|| DEFAULT_VISIT_TYPE.to_string()),
            tests_done: clean(treatment.tests_done),
            diagnosis,
            prescription: clean(treatment.prescription),
            medicines: clean(treatment.medicines),
            follow_up_notes: clean(treatment.follow_up_notes),
            created_at: Utc::now(),
        };
        records::insert_treatment(self.conn, &record)?;

        info!("Appointment {} completed with treatment {}", appointment_id, record.id);
        records::get_details(self.conn, appointment_id)
    }

    pub fn get_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let details = records::get_details(self.conn, appointment_id)?;
        Actor::resolve(self.conn, principal)?.ensure_can_view(&details.appointment)?;
        Ok(details)
    }

    /// List appointments visible to the principal, narrowed by `filter`.
    pub fn list_appointments(
        &self,
        principal: &Principal,
        mut filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        match Actor::resolve(self.conn, principal)? {
            Actor::Admin => {}
            Actor::Doctor { doctor_id } => filter.doctor_id = Some(doctor_id),
            Actor::Patient { patient_id } => filter.patient_id = Some(patient_id),
        }

        let mut appointments = records::list_details(self.conn, &filter)?;
        records::attach_treatments(self.conn, &mut appointments)?;

        debug!("Listed {} appointments for {}", appointments.len(), principal.id);
        Ok(appointments)
    }

    /// Admin-only removal. Completed visits stay as medical records.
    pub fn delete_appointment(&self, principal: &Principal, appointment_id: Uuid) -> Result<(), AppointmentError> {
        if !principal.is_admin() {
            return Err(AppointmentError::Forbidden("admin access required".to_string()));
        }
        let current = records::get_appointment(self.conn, appointment_id)?;
        if current.status == AppointmentStatus::Completed {
            warn!("Refused to delete completed appointment {}", appointment_id);
            return Err(AppointmentError::PermanentRecord);
        }

        records::delete_appointment_row(self.conn, appointment_id)?;
        info!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    pub fn check_conflicts(&self, request: ConflictCheckRequest) -> Result<ConflictCheckResponse, AppointmentError> {
        let slot = self.requested_slot(request.date, request.start_time, request.end_time)?;
        self.conflict_service
            .check_slot(request.doctor_id, &slot, request.exclude_appointment_id)
    }
}
