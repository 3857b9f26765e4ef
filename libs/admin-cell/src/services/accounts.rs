use rusqlite::{params, Connection};
use tracing::{info, warn};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use patient_cell::services::PatientService;
use shared_database::accounts;
use shared_models::auth::Role;

use crate::models::{AdminError, DeletionSummary};

#[derive(Debug, Clone, Copy)]
enum ProfileKind {
    Doctor,
    Patient,
}

impl ProfileKind {
    fn appointment_column(self) -> &'static str {
        match self {
            ProfileKind::Doctor => "doctor_id",
            ProfileKind::Patient => "patient_id",
        }
    }
}

/// Removes an account together with everything that hangs off it.
///
/// Foreign keys carry no cascade, so the order matters: treatment records,
/// then appointments, then the profile, then the `users` row. The caller's
/// transaction makes the whole procedure all-or-nothing.
pub struct AccountDeletionService<'a> {
    conn: &'a Connection,
}

impl<'a> AccountDeletionService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn delete_doctor(&self, doctor_id: Uuid) -> Result<DeletionSummary, AdminError> {
        let doctors = DoctorService::new(self.conn);
        let doctor = doctors.get_doctor(doctor_id)?;

        let (treatments_removed, appointments_removed) = self.delete_appointments(ProfileKind::Doctor, doctor_id)?;
        doctors.delete_profile_row(doctor_id)?;
        accounts::delete_account_row(self.conn, doctor.user_id)?;

        info!(
            "Deleted doctor {} ({} appointments, {} treatments)",
            doctor_id, appointments_removed, treatments_removed
        );
        Ok(DeletionSummary {
            account_id: doctor.user_id,
            profile_id: doctor_id,
            treatments_removed,
            appointments_removed,
        })
    }

    pub fn delete_patient(&self, patient_id: Uuid) -> Result<DeletionSummary, AdminError> {
        let patients = PatientService::new(self.conn);
        let patient = patients.get_patient(patient_id)?;

        let (treatments_removed, appointments_removed) = self.delete_appointments(ProfileKind::Patient, patient_id)?;
        patients.delete_profile_row(patient_id)?;
        accounts::delete_account_row(self.conn, patient.user_id)?;

        info!(
            "Deleted patient {} ({} appointments, {} treatments)",
            patient_id, appointments_removed, treatments_removed
        );
        Ok(DeletionSummary {
            account_id: patient.user_id,
            profile_id: patient_id,
            treatments_removed,
            appointments_removed,
        })
    }

    /// Deletes by account id, dispatching on the account's role.
    pub fn delete_account(&self, user_id: Uuid) -> Result<DeletionSummary, AdminError> {
        let account = accounts::find_account(self.conn, user_id)?.ok_or(AdminError::AccountNotFound)?;

        match account.role {
            Role::Admin => {
                warn!("Refused to delete admin account {}", user_id);
                Err(AdminError::AdminAccountProtected)
            }
            Role::Doctor => match DoctorService::new(self.conn).find_by_user(user_id)? {
                Some(doctor) => self.delete_doctor(doctor.id),
                None => self.delete_bare_account(user_id),
            },
            Role::Patient => match PatientService::new(self.conn).find_by_user(user_id)? {
                Some(patient) => self.delete_patient(patient.id),
                None => self.delete_bare_account(user_id),
            },
        }
    }

    fn delete_bare_account(&self, user_id: Uuid) -> Result<DeletionSummary, AdminError> {
        accounts::delete_account_row(self.conn, user_id)?;
        info!("Deleted account {} without a profile", user_id);
        Ok(DeletionSummary {
            account_id: user_id,
            ..DeletionSummary::default()
        })
    }

    fn delete_appointments(&self, kind: ProfileKind, profile_id: Uuid) -> Result<(usize, usize), AdminError> {
        let column = kind.appointment_column();
        let treatments = self.conn.execute(
            &format!(
                "DELETE FROM treatments WHERE appointment_id IN (SELECT id FROM appointments WHERE {} = ?1)",
                column
            ),
            params![profile_id.to_string()],
        )?;
        let appointments = self.conn.execute(
            &format!("DELETE FROM appointments WHERE {} = ?1", column),
            params![profile_id.to_string()],
        )?;
        Ok((treatments, appointments))
    }
}
