use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::router::{appointment_routes, doctor_appointment_routes};
use appointment_cell::services::AppointmentBookingService;
use shared_utils::test_utils::{Seeded, TestContext};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn seed_booking(ctx: &TestContext, doctor: &Seeded, patient: &Seeded) -> String {
    let request: BookAppointmentRequest = serde_json::from_value(json!({
        "doctor_id": doctor.profile_id,
        "date": "2030-01-07",
        "start_time": "09:00"
    }))
    .unwrap();
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    ctx.db()
        .transaction_blocking(|tx| {
            AppointmentBookingService::new(tx, 30).book_appointment(&patient.principal(), request, today)
        })
        .unwrap()
        .appointment
        .id
        .to_string()
}

#[tokio::test]
async fn test_conflict_check_endpoint_reports_taken_slot() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    seed_booking(&ctx, &doctor, &patient);

    let uri = format!(
        "/conflicts/check?doctor_id={}&date={}&start_time=09:15&end_time=09:45",
        doctor.profile_id,
        monday()
    );
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, ctx.bearer(&patient.account))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(appointment_routes(ctx.state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookable"], false);
    assert_eq!(body["check"]["has_conflict"], true);
    assert_eq!(body["check"]["within_availability"], true);
    assert_eq!(body["check"]["conflicting_slots"][0]["start_time"], "09:00");
}

#[tokio::test]
async fn test_conflict_check_hides_other_patients_bookings() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let other = ctx.create_patient("Olive", "olive@example.com");

    let request: BookAppointmentRequest = serde_json::from_value(json!({
        "doctor_id": doctor.profile_id,
        "date": "2030-01-07",
        "start_time": "09:00",
        "notes": "Follow-up on test results"
    }))
    .unwrap();
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    ctx.db()
        .transaction_blocking(|tx| {
            AppointmentBookingService::new(tx, 30).book_appointment(&patient.principal(), request, today)
        })
        .unwrap();

    let uri = format!(
        "/conflicts/check?doctor_id={}&date={}&start_time=09:00",
        doctor.profile_id,
        monday()
    );
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, ctx.bearer(&other.account))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(appointment_routes(ctx.state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["check"]["has_conflict"], true);
    let taken = &body["check"]["conflicting_slots"][0];
    assert_eq!(taken["start_time"], "09:00");
    assert_eq!(taken["end_time"], "09:30");

    let raw = body.to_string();
    assert!(!raw.contains("patient_id"));
    assert!(!raw.contains("notes"));
    assert!(!raw.contains(&patient.profile_id.to_string()));
    assert!(!raw.contains("Follow-up on test results"));
}

#[tokio::test]
async fn test_appointment_detail_requires_ownership() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let stranger = ctx.create_patient("Stranger", "stranger@example.com");
    let id = seed_booking(&ctx, &doctor, &patient);

    let get = |account: &shared_models::auth::UserAccount| {
        Request::builder()
            .uri(format!("/{}", id))
            .header(header::AUTHORIZATION, ctx.bearer(account))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(appointment_routes(ctx.state.clone()), get(&patient.account)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Booked");
    assert_eq!(body["doctor_name"], "Dr. Grey");

    let (status, body) = send(appointment_routes(ctx.state.clone()), get(&stranger.account)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("does not belong to you"));
}

#[tokio::test]
async fn test_doctor_completes_appointment_over_http() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let id = seed_booking(&ctx, &doctor, &patient);

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/appointments/{}/complete", id))
        .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"diagnosis": "Hypertension", "prescription": "Amlodipine"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(doctor_appointment_routes(ctx.state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "Completed");
    assert_eq!(body["appointment"]["treatment"]["appointment_id"], id);
    assert_eq!(body["appointment"]["treatment"]["visit_type"], "In-person");

    let again = Request::builder()
        .method(Method::POST)
        .uri(format!("/appointments/{}/cancel", id))
        .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(doctor_appointment_routes(ctx.state.clone()), again).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_doctor_lists_own_appointments_by_status() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    seed_booking(&ctx, &doctor, &patient);

    let list = |status: &str| {
        Request::builder()
            .uri(format!("/appointments?status={}", status))
            .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(doctor_appointment_routes(ctx.state.clone()), list("Booked")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (_, body) = send(doctor_appointment_routes(ctx.state.clone()), list("completed")).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(doctor_appointment_routes(ctx.state.clone()), list("lost")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_cannot_open_doctor_desk() {
    let ctx = TestContext::new();
    let patient = ctx.create_patient("Pat", "pat@example.com");

    let request = Request::builder()
        .uri("/dashboard")
        .header(header::AUTHORIZATION, ctx.bearer(&patient.account))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(doctor_appointment_routes(ctx.state.clone()), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "doctor access required");
}
