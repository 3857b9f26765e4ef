use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use tokio_test::assert_ok;
use uuid::Uuid;

use admin_cell::models::{AdminError, SearchQuery, SearchType};
use admin_cell::services::{AccountDeletionService, AdminDashboardService, AdminRecordsService, AdminSearchService};
use appointment_cell::models::{
    AppointmentDetails, AppointmentStatus, BookAppointmentRequest, CancelAppointmentRequest, TreatmentInput,
};
use appointment_cell::services::AppointmentBookingService;
use shared_models::auth::Principal;
use shared_utils::test_utils::{Seeded, TestContext};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

struct Hospital {
    ctx: TestContext,
    admin: Principal,
    doctor: Seeded,
    first: Seeded,
    second: Seeded,
}

fn hospital() -> Hospital {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let first = ctx.create_patient("Pat Smith", "pat@example.com");
    let second = ctx.create_patient("Olive Jones", "olive@example.org");
    let admin = ctx.create_admin("admin@example.com").principal();
    Hospital {
        ctx,
        admin,
        doctor,
        first,
        second,
    }
}

fn book(h: &Hospital, patient: &Seeded, start: &str) -> AppointmentDetails {
    let request: BookAppointmentRequest = serde_json::from_value(json!({
        "doctor_id": h.doctor.profile_id,
        "date": monday(),
        "start_time": start,
        "patient_id": patient.profile_id
    }))
    .unwrap();
    h.ctx
        .db()
        .transaction_blocking(|tx| AppointmentBookingService::new(tx, 30).book_appointment(&h.admin, request, today()))
        .unwrap()
}

fn complete(h: &Hospital, appointment_id: Uuid) {
    let treatment: TreatmentInput = serde_json::from_value(json!({"diagnosis": "Hypertension"})).unwrap();
    h.ctx
        .db()
        .transaction_blocking(|tx| {
            AppointmentBookingService::new(tx, 30).complete_appointment(&h.doctor.principal(), appointment_id, treatment)
        })
        .unwrap();
}

#[test]
fn test_deleting_doctor_leaves_no_orphans() {
    let h = hospital();
    let first = book(&h, &h.first, "09:00");
    book(&h, &h.second, "10:00");
    complete(&h, first.appointment.id);

    let summary = assert_ok!(h
        .ctx
        .db()
        .transaction_blocking(|tx| AccountDeletionService::new(tx).delete_doctor(h.doctor.profile_id)));

    assert_eq!(summary.account_id, h.doctor.account.id);
    assert_eq!(summary.appointments_removed, 2);
    assert_eq!(summary.treatments_removed, 1);
    assert_eq!(h.ctx.count("treatments"), 0);
    assert_eq!(h.ctx.count("appointments"), 0);
    assert_eq!(h.ctx.count("doctor_profiles"), 0);
    assert_eq!(h.ctx.count("patient_profiles"), 2);
    assert_eq!(h.ctx.count("users"), 3);
}

#[test]
fn test_deleting_patient_keeps_other_records() {
    let h = hospital();
    let first = book(&h, &h.first, "09:00");
    book(&h, &h.second, "10:00");
    complete(&h, first.appointment.id);

    let summary = h
        .ctx
        .db()
        .transaction_blocking(|tx| AccountDeletionService::new(tx).delete_account(h.first.account.id))
        .unwrap();

    assert_eq!(summary.profile_id, h.first.profile_id);
    assert_eq!(summary.appointments_removed, 1);
    assert_eq!(h.ctx.count("treatments"), 0);
    assert_eq!(h.ctx.count("appointments"), 1);
    assert_eq!(h.ctx.count("patient_profiles"), 1);
    assert_eq!(h.ctx.count("doctor_profiles"), 1);
}

#[test]
fn test_admin_accounts_are_protected() {
    let h = hospital();

    let result = h
        .ctx
        .db()
        .transaction_blocking(|tx| AccountDeletionService::new(tx).delete_account(h.admin.id));
    assert_matches!(result, Err(AdminError::AdminAccountProtected));

    let missing = h
        .ctx
        .db()
        .transaction_blocking(|tx| AccountDeletionService::new(tx).delete_account(Uuid::new_v4()));
    assert_matches!(missing, Err(AdminError::AccountNotFound));
    assert_eq!(h.ctx.count("users"), 4);
}

#[test]
fn test_dashboard_counts_and_lists() {
    let h = hospital();
    book(&h, &h.first, "09:00");
    let cancelled = book(&h, &h.second, "10:00");
    h.ctx
        .db()
        .transaction_blocking(|tx| {
            AppointmentBookingService::new(tx, 30).cancel_appointment(
                &h.admin,
                cancelled.appointment.id,
                CancelAppointmentRequest::default(),
            )
        })
        .unwrap();

    let dashboard = h
        .ctx
        .db()
        .transaction_blocking(|tx| AdminDashboardService::new(tx).dashboard(today()))
        .unwrap();

    assert_eq!(dashboard.stats.total_doctors, 1);
    assert_eq!(dashboard.stats.total_patients, 2);
    assert_eq!(dashboard.stats.total_departments, 1);
    assert_eq!(dashboard.stats.total_appointments, 2);
    assert_eq!(dashboard.stats.upcoming_appointments, 1);
    assert_eq!(dashboard.recent_appointments.len(), 2);
    assert_eq!(dashboard.upcoming_appointments.len(), 1);
    assert_eq!(dashboard.upcoming_appointments[0].appointment.status, AppointmentStatus::Booked);
}

#[test]
fn test_search_by_type() {
    let h = hospital();
    let search = |q: Option<&str>, search_type: SearchType| {
        let query = SearchQuery {
            q: q.map(str::to_string),
            search_type,
        };
        h.ctx
            .db()
            .transaction_blocking(|tx| AdminSearchService::new(tx).search(&query))
            .unwrap()
    };

    let by_department = search(Some("cardio"), SearchType::All);
    assert_eq!(by_department.doctors.len(), 1);
    assert!(by_department.patients.is_empty());

    let by_email = search(Some("example.org"), SearchType::Patients);
    assert_eq!(by_email.patients.len(), 1);
    assert_eq!(by_email.patients[0].profile.name, "Olive Jones");

    let doctors_only = search(Some("smith"), SearchType::Doctors);
    assert!(doctors_only.patients.is_empty());
    assert!(doctors_only.doctors.is_empty());

    let blank = search(Some("  "), SearchType::All);
    assert!(blank.doctors.is_empty() && blank.patients.is_empty());
}

#[test]
fn test_patient_record_includes_treatments() {
    let h = hospital();
    let first = book(&h, &h.first, "09:00");
    complete(&h, first.appointment.id);

    let record = h
        .ctx
        .db()
        .transaction_blocking(|tx| AdminRecordsService::new(tx).patient_record(h.first.profile_id, today()))
        .unwrap();

    assert_eq!(record.patient.age, Some(39));
    assert_eq!(record.appointments.len(), 1);
    let treatment = record.appointments[0].treatment.as_ref().unwrap();
    assert_eq!(treatment.diagnosis, "Hypertension");
    assert_eq!(treatment.appointment_id, first.appointment.id);
}
