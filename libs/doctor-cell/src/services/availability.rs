use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{date_param, time_column, timestamp_param, uuid_column};
use shared_models::auth::Principal;

use crate::models::{
    minutes_of_day, time_from_minutes, AvailabilityError, DoctorError, DoctorProfile, Slot,
    TimeRange, WeeklyAvailability,
};
use crate::services::doctor::{availability_param, DoctorService};

pub use shared_config::{MAX_SLOT_MINUTES, MIN_SLOT_MINUTES};

/// Cut each declared range for `date` into back-to-back slots of
/// `slot_minutes`, dropping any that overlap a booked range.
pub fn free_slots(
    availability: &WeeklyAvailability,
    date: NaiveDate,
    booked: &[TimeRange],
    slot_minutes: u32,
) -> Result<Vec<Slot>, AvailabilityError> {
    if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&slot_minutes) {
        return Err(AvailabilityError::InvalidSlotLength);
    }

    let mut slots = Vec::new();
    for declared in availability.ranges_for(date) {
        let end = minutes_of_day(declared.end());
        let mut start = minutes_of_day(declared.start());

        while start + slot_minutes <= end {
            let candidate = match (time_from_minutes(start), time_from_minutes(start + slot_minutes)) {
                (Some(from), Some(to)) => TimeRange::new(from, to)?,
                _ => break,
            };
            if !booked.iter().any(|taken| taken.overlaps(&candidate)) {
                slots.push(Slot::from_range(date, candidate));
            }
            start += slot_minutes;
        }
    }
    Ok(slots)
}

pub struct AvailabilityService<'a> {
    conn: &'a Connection,
}

impl<'a> AvailabilityService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get_availability(&self, doctor_id: Uuid) -> Result<WeeklyAvailability, DoctorError> {
        Ok(DoctorService::new(self.conn).get_doctor(doctor_id)?.availability)
    }

    /// Admins may edit any schedule, doctors only their own.
    pub fn replace_availability(
        &self,
        principal: &Principal,
        doctor_id: Uuid,
        availability: WeeklyAvailability,
    ) -> Result<DoctorProfile, DoctorError> {
        let doctors = DoctorService::new(self.conn);
        let doctor = doctors.get_doctor(doctor_id)?;

        if !(principal.is_admin() || (principal.is_doctor() && doctor.user_id == principal.id)) {
            return Err(DoctorError::Forbidden(
                "You can only change your own availability".to_string(),
            ));
        }

        self.conn.execute(
            "UPDATE doctor_profiles SET availability = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                doctor_id.to_string(),
                availability_param(&availability)?,
                timestamp_param(Utc::now()),
            ],
        )?;

        info!("Availability of doctor {} replaced by {} {}", doctor_id, principal.role, principal.id);
        doctors.get_doctor(doctor_id)
    }

    /// Booked appointment ranges for the doctor on `date`, optionally
    /// ignoring one appointment (the one being rescheduled).
    pub fn booked_ranges(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<(Uuid, TimeRange)>, DoctorError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time FROM appointments
             WHERE doctor_id = ?1 AND date = ?2 AND status = 'Booked'
             ORDER BY start_time",
        )?;
        let rows = stmt.query_map(params![doctor_id.to_string(), date_param(date)], |row| {
            Ok((uuid_column(row, 0)?, time_column(row, 1)?, time_column(row, 2)?))
        })?;

        let mut ranges = Vec::new();
        for row in rows {
            let (id, start, end) = row?;
            if Some(id) == exclude {
                continue;
            }
            ranges.push((id, TimeRange::new(start, end)?));
        }
        Ok(ranges)
    }

    pub fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot_minutes: u32,
    ) -> Result<Vec<Slot>, DoctorError> {
        let doctor = DoctorService::new(self.conn).get_doctor(doctor_id)?;
        if !doctor.is_active {
            return Ok(Vec::new());
        }

        let booked: Vec<TimeRange> = self
            .booked_ranges(doctor_id, date, None)?
            .into_iter()
            .map(|(_, range)| range)
            .collect();
        let slots = free_slots(&doctor.availability, date, &booked, slot_minutes)?;

        debug!("Doctor {} has {} free slots on {}", doctor_id, slots.len(), date);
        Ok(slots)
    }

    /// First date in `[from, from + horizon_days)` with a free slot.
    pub fn next_available_date(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        horizon_days: u32,
        slot_minutes: u32,
    ) -> Result<Option<NaiveDate>, DoctorError> {
        let doctor = DoctorService::new(self.conn).get_doctor(doctor_id)?;
        if !doctor.is_active || doctor.availability.is_empty() {
            return Ok(None);
        }

        for offset in 0..horizon_days {
            let date = from + Duration::days(i64::from(offset));
            if doctor.availability.ranges_for(date).is_empty() {
                continue;
            }
            if !self.available_slots(doctor_id, date, slot_minutes)?.is_empty() {
                return Ok(Some(date));
            }
        }
        Ok(None)
    }
}
