use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::models::{DoctorProfile, Slot, TimeRange};
use doctor_cell::services::availability::{free_slots, MAX_SLOT_MINUTES, MIN_SLOT_MINUTES};
use doctor_cell::services::DoctorService;

use crate::models::{Appointment, AppointmentError, ConflictCheckResponse};
use crate::services::records;

const MAX_SUGGESTIONS: usize = 5;

/// Half-open overlap: touching appointments do not conflict.
pub fn appointments_overlap(first: &TimeRange, second: &TimeRange) -> bool {
    first.overlaps(second)
}

pub struct ConflictDetectionService<'a> {
    conn: &'a Connection,
}

impl<'a> ConflictDetectionService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Evaluate `slot` for the doctor: is it inside their weekly
    /// availability, and which Booked appointments does it overlap?
    pub fn check_slot(
        &self,
        doctor_id: Uuid,
        slot: &Slot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        let doctor = DoctorService::new(self.conn).get_doctor(doctor_id)?;
        self.check_slot_for(&doctor, slot, exclude_appointment_id)
    }

    pub fn check_slot_for(
        &self,
        doctor: &DoctorProfile,
        slot: &Slot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        debug!("Checking slot {} for doctor {}", slot, doctor.id);

        let requested = slot.range();
        let within_availability = doctor.availability.covers(slot.date(), &requested);

        let booked: Vec<Appointment> = records::booked_for_doctor_on(self.conn, doctor.id, slot.date())?
            .into_iter()
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .collect();

        let mut booked_ranges = Vec::with_capacity(booked.len());
        let mut conflicting_slots = Vec::new();
        for appointment in booked {
            let taken = appointment.slot()?;
            let range = taken.range();
            booked_ranges.push(range);
            if appointments_overlap(&requested, &range) {
                conflicting_slots.push(taken);
            }
        }
        let has_conflict = !conflicting_slots.is_empty();

        let suggested_alternatives = if has_conflict || !within_availability {
            let length = requested.minutes().clamp(MIN_SLOT_MINUTES, MAX_SLOT_MINUTES);
            let mut slots = free_slots(&doctor.availability, slot.date(), &booked_ranges, length)?;
            slots.truncate(MAX_SUGGESTIONS);
            slots
        } else {
            Vec::new()
        };

        if has_conflict {
            warn!(
                "Conflict detected for doctor {} - {} conflicting appointments",
                doctor.id,
                conflicting_slots.len()
            );
        }

        Ok(ConflictCheckResponse {
            slot: *slot,
            within_availability,
            has_conflict,
            conflicting_slots,
            suggested_alternatives,
        })
    }

    /// `check_slot`, turned into the validation failure callers report.
    pub fn ensure_bookable(
        &self,
        doctor: &DoctorProfile,
        slot: &Slot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let check = self.check_slot_for(doctor, slot, exclude_appointment_id)?;

        if !check.within_availability {
            return Err(AppointmentError::OutsideAvailability(*slot));
        }
        if check.has_conflict {
            let conflicts = check
                .conflicting_slots
                .iter()
                .map(|taken| taken.range().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppointmentError::SlotConflict {
                slot: *slot,
                conflicts,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn range(a: (u32, u32), b: (u32, u32)) -> TimeRange {
        TimeRange::new(
            NaiveTime::from_hms_opt(a.0, a.1, 0).unwrap(),
            NaiveTime::from_hms_opt(b.0, b.1, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_overlap_is_half_open() {
        let booked = range((9, 0), (9, 30));

        assert!(appointments_overlap(&booked, &range((9, 15), (9, 45))));
        assert!(appointments_overlap(&booked, &range((8, 0), (12, 0))));
        assert!(!appointments_overlap(&booked, &range((9, 30), (10, 0))));
        assert!(!appointments_overlap(&booked, &range((8, 30), (9, 0))));
    }
}
