//! Row-level reads and writes for `appointments`, `treatments` and the
//! patient rows appointments point at.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use shared_database::{
    date_column, date_param, enum_column, time_column, time_param, timestamp_column,
    timestamp_param, uuid_column,
};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentFilter, AppointmentStatus,
    AppointmentView, PatientSummary, TreatmentRecord,
};

const DETAILS_SELECT: &str = "SELECT a.id, a.patient_id, a.doctor_id, a.date, a.start_time, a.end_time,
        a.status, a.notes, a.created_at, a.updated_at,
        pu.name, pu.id, du.name, du.id, d.name
     FROM appointments a
     JOIN patient_profiles pp ON pp.id = a.patient_id
     JOIN users pu ON pu.id = pp.user_id
     JOIN doctor_profiles dp ON dp.id = a.doctor_id
     JOIN users du ON du.id = dp.user_id
     JOIN departments d ON d.id = dp.department_id";

const TREATMENT_COLUMNS: &str = "id, appointment_id, visit_type, tests_done, diagnosis, prescription,
        medicines, follow_up_notes, created_at";

const PATIENT_SELECT: &str = "SELECT pp.id, pp.user_id, u.name, u.email, COALESCE(pp.contact, u.contact), u.is_active
     FROM patient_profiles pp
     JOIN users u ON u.id = pp.user_id";

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_column(row, 0)?,
        patient_id: uuid_column(row, 1)?,
        doctor_id: uuid_column(row, 2)?,
        date: date_column(row, 3)?,
        start_time: time_column(row, 4)?,
        end_time: time_column(row, 5)?,
        status: enum_column(row, 6)?,
        notes: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn map_details(row: &Row<'_>) -> rusqlite::Result<AppointmentDetails> {
    Ok(AppointmentDetails {
        appointment: map_appointment(row)?,
        patient_name: row.get(10)?,
        patient_user_id: uuid_column(row, 11)?,
        doctor_name: row.get(12)?,
        doctor_user_id: uuid_column(row, 13)?,
        department_name: row.get(14)?,
        treatment: None,
    })
}

fn map_treatment(row: &Row<'_>) -> rusqlite::Result<TreatmentRecord> {
    Ok(TreatmentRecord {
        id: uuid_column(row, 0)?,
        appointment_id: uuid_column(row, 1)?,
        visit_type: row.get(2)?,
        tests_done: row.get(3)?,
        diagnosis: row.get(4)?,
        prescription: row.get(5)?,
        medicines: row.get(6)?,
        follow_up_notes: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

fn map_patient(row: &Row<'_>) -> rusqlite::Result<PatientSummary> {
    Ok(PatientSummary {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        contact: row.get(4)?,
        is_active: row.get(5)?,
    })
}

// ---- appointments ----------------------------------------------------------

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> Result<(), AppointmentError> {
    conn.execute(
        "INSERT INTO appointments
            (id, patient_id, doctor_id, date, start_time, end_time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            appointment.id.to_string(),
            appointment.patient_id.to_string(),
            appointment.doctor_id.to_string(),
            date_param(appointment.date),
            time_param(appointment.start_time),
            time_param(appointment.end_time),
            appointment.status.as_str(),
            appointment.notes,
            timestamp_param(appointment.created_at),
            timestamp_param(appointment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_appointment(conn: &Connection, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
    let appointment = conn
        .query_row(
            "SELECT id, patient_id, doctor_id, date, start_time, end_time, status, notes, created_at, updated_at
             FROM appointments WHERE id = ?1",
            params![id.to_string()],
            map_appointment,
        )
        .optional()?;
    Ok(appointment)
}

pub fn get_appointment(conn: &Connection, id: Uuid) -> Result<Appointment, AppointmentError> {
    find_appointment(conn, id)?.ok_or(AppointmentError::NotFound)
}

pub fn get_details(conn: &Connection, id: Uuid) -> Result<AppointmentDetails, AppointmentError> {
    let mut details = conn
        .query_row(
            &format!("{} WHERE a.id = ?1", DETAILS_SELECT),
            params![id.to_string()],
            map_details,
        )
        .optional()?
        .ok_or(AppointmentError::NotFound)?;
    details.treatment = find_treatment(conn, id)?;
    Ok(details)
}

/// Booked appointments of a doctor on one date, in start order.
pub fn booked_for_doctor_on(
    conn: &Connection,
    doctor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<Appointment>, AppointmentError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, date, start_time, end_time, status, notes, created_at, updated_at
         FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND status = 'Booked'
         ORDER BY start_time",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string(), date_param(date)], map_appointment)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn list_details(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentDetails>, AppointmentError> {
    let mut sql = format!("{} WHERE 1 = 1", DETAILS_SELECT);
    let mut args: Vec<String> = Vec::new();

    let mut bind = |sql: &mut String, clause: &str, value: String| {
        args.push(value);
        sql.push_str(&clause.replace('?', &format!("?{}", args.len())));
    };

    if let Some(doctor_id) = filter.doctor_id {
        bind(&mut sql, " AND a.doctor_id = ?", doctor_id.to_string());
    }
    if let Some(patient_id) = filter.patient_id {
        bind(&mut sql, " AND a.patient_id = ?", patient_id.to_string());
    }
    if let Some(status) = filter.status {
        bind(&mut sql, " AND a.status = ?", status.as_str().to_string());
    }
    if let Some(date) = filter.date {
        bind(&mut sql, " AND a.date = ?", date_param(date));
    }
    let today = filter.today.unwrap_or_else(|| Utc::now().date_naive());
    match filter.view {
        AppointmentView::Upcoming => bind(&mut sql, " AND a.date >= ?", date_param(today)),
        AppointmentView::Past => bind(&mut sql, " AND a.date < ?", date_param(today)),
        AppointmentView::All => {}
    }

    if filter.view == AppointmentView::Upcoming {
        sql.push_str(" ORDER BY a.date ASC, a.start_time ASC");
    } else {
        sql.push_str(" ORDER BY a.date DESC, a.start_time DESC");
    }
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), map_details)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn attach_treatments(
    conn: &Connection,
    appointments: &mut [AppointmentDetails],
) -> Result<(), AppointmentError> {
    for details in appointments.iter_mut() {
        if details.appointment.status == AppointmentStatus::Completed {
            details.treatment = find_treatment(conn, details.appointment.id)?;
        }
    }
    Ok(())
}

pub fn count_appointments(conn: &Connection, filter: &AppointmentFilter) -> Result<usize, AppointmentError> {
    let unlimited = AppointmentFilter {
        limit: None,
        ..filter.clone()
    };
    Ok(list_details(conn, &unlimited)?.len())
}

pub fn update_slot(
    conn: &Connection,
    id: Uuid,
    date: NaiveDate,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
) -> Result<(), AppointmentError> {
    conn.execute(
        "UPDATE appointments SET date = ?2, start_time = ?3, end_time = ?4, updated_at = ?5 WHERE id = ?1",
        params![
            id.to_string(),
            date_param(date),
            time_param(start),
            time_param(end),
            timestamp_param(Utc::now()),
        ],
    )?;
    Ok(())
}

pub fn update_status(
    conn: &Connection,
    id: Uuid,
    status: AppointmentStatus,
    notes: Option<&str>,
) -> Result<(), AppointmentError> {
    conn.execute(
        "UPDATE appointments SET status = ?2, notes = COALESCE(?3, notes), updated_at = ?4 WHERE id = ?1",
        params![id.to_string(), status.as_str(), notes, timestamp_param(Utc::now())],
    )?;
    Ok(())
}

pub fn delete_appointment_row(conn: &Connection, id: Uuid) -> Result<(), AppointmentError> {
    conn.execute("DELETE FROM treatments WHERE appointment_id = ?1", params![id.to_string()])?;
    let changed = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(AppointmentError::NotFound);
    }
    Ok(())
}

// ---- treatments ------------------------------------------------------------

pub fn insert_treatment(conn: &Connection, record: &TreatmentRecord) -> Result<(), AppointmentError> {
    conn.execute(
        &format!(
            "INSERT INTO treatments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            TREATMENT_COLUMNS
        ),
        params![
            record.id.to_string(),
            record.appointment_id.to_string(),
            record.visit_type,
            record.tests_done,
            record.diagnosis,
            record.prescription,
            record.medicines,
            record.follow_up_notes,
            timestamp_param(record.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_treatment(conn: &Connection, appointment_id: Uuid) -> Result<Option<TreatmentRecord>, AppointmentError> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM treatments WHERE appointment_id = ?1", TREATMENT_COLUMNS),
            params![appointment_id.to_string()],
            map_treatment,
        )
        .optional()?;
    Ok(record)
}

// ---- patients --------------------------------------------------------------

pub fn find_patient(conn: &Connection, id: Uuid) -> Result<Option<PatientSummary>, AppointmentError> {
    let patient = conn
        .query_row(
            &format!("{} WHERE pp.id = ?1", PATIENT_SELECT),
            params![id.to_string()],
            map_patient,
        )
        .optional()?;
    Ok(patient)
}

pub fn find_patient_by_user(conn: &Connection, user_id: Uuid) -> Result<Option<PatientSummary>, AppointmentError> {
    let patient = conn
        .query_row(
            &format!("{} WHERE pp.user_id = ?1", PATIENT_SELECT),
            params![user_id.to_string()],
            map_patient,
        )
        .optional()?;
    Ok(patient)
}

/// Patients with at least one appointment with the doctor, by name.
pub fn patients_of_doctor(conn: &Connection, doctor_id: Uuid) -> Result<Vec<PatientSummary>, AppointmentError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE pp.id IN (SELECT DISTINCT patient_id FROM appointments WHERE doctor_id = ?1)
         ORDER BY u.name",
        PATIENT_SELECT
    ))?;
    let rows = stmt.query_map(params![doctor_id.to_string()], map_patient)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
