use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Weekday;
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::doctor_appointment_routes;
use patient_cell::router::patient_routes;
use shared_utils::test_utils::{next_weekday, TestContext};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(method: Method, uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, bearer)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_patient_books_and_doctor_completes() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let monday = next_weekday(ctx.state.today(), Weekday::Mon);

    let (status, body) = send(
        patient_routes(ctx.state.clone()),
        json_request(
            Method::POST,
            "/appointments",
            &ctx.bearer(&patient.account),
            json!({"doctor_id": doctor.profile_id, "date": monday, "start_time": "09:00", "end_time": "09:30"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        doctor_appointment_routes(ctx.state.clone()),
        json_request(
            Method::POST,
            &format!("/appointments/{}/complete", id),
            &ctx.bearer(&doctor.account),
            json!({"diagnosis": "Stable angina", "medicines": "Aspirin"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "Completed");
    assert_eq!(body["appointment"]["treatment"]["appointment_id"], id);

    let (status, body) = send(patient_routes(ctx.state.clone()), get("/history", &ctx.bearer(&patient.account))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["history"][0]["treatment"]["diagnosis"], "Stable angina");
}

#[tokio::test]
async fn test_overlapping_booking_is_a_conflict() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let first = ctx.create_patient("Pat", "pat@example.com");
    let second = ctx.create_patient("Sam", "sam@example.com");
    let monday = next_weekday(ctx.state.today(), Weekday::Mon);

    let book = |bearer: String, start: &str, end: &str| {
        json_request(
            Method::POST,
            "/appointments",
            &bearer,
            json!({"doctor_id": doctor.profile_id, "date": monday, "start_time": start, "end_time": end}),
        )
    };

    let (status, _) = send(patient_routes(ctx.state.clone()), book(ctx.bearer(&first.account), "09:00", "09:30")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send(patient_routes(ctx.state.clone()), book(ctx.bearer(&second.account), "09:15", "09:45")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("09:00-09:30"));

    let (status, _) = send(patient_routes(ctx.state.clone()), book(ctx.bearer(&second.account), "09:30", "10:00")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(patient_routes(ctx.state.clone()), book(ctx.bearer(&second.account), "12:30", "13:00")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_reschedules_then_cancels() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let bearer = ctx.bearer(&patient.account);
    let monday = next_weekday(ctx.state.today(), Weekday::Mon);

    let (_, body) = send(
        patient_routes(ctx.state.clone()),
        json_request(
            Method::POST,
            "/appointments",
            &bearer,
            json!({"doctor_id": doctor.profile_id, "date": monday, "start_time": "09:00"}),
        ),
    )
    .await;
    let id = body["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        patient_routes(ctx.state.clone()),
        json_request(
            Method::POST,
            &format!("/appointments/{}/reschedule", id),
            &bearer,
            json!({"date": monday, "start_time": "15:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["start_time"], "15:00");
    assert_eq!(body["appointment"]["end_time"], "15:30");

    let (status, body) = send(
        patient_routes(ctx.state.clone()),
        json_request(
            Method::POST,
            &format!("/appointments/{}/cancel", id),
            &bearer,
            json!({"reason": "Travelling"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "Cancelled");

    let (status, _) = send(
        patient_routes(ctx.state.clone()),
        json_request(
            Method::POST,
            &format!("/appointments/{}/reschedule", id),
            &bearer,
            json!({"date": monday, "start_time": "16:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_profile_reports_age() {
    let ctx = TestContext::new();
    let patient = ctx.create_patient("Pat", "pat@example.com");

    let (status, body) = send(patient_routes(ctx.state.clone()), get("/profile", &ctx.bearer(&patient.account))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date_of_birth"], "1990-05-17");
    assert!(body["age"].as_u64().unwrap() >= 35);
}

#[tokio::test]
async fn test_doctor_cannot_use_patient_routes() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);

    let (status, body) = send(patient_routes(ctx.state.clone()), get("/dashboard", &ctx.bearer(&doctor.account))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "patient access required");
}

#[tokio::test]
async fn test_doctor_slots_endpoint() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let monday = next_weekday(ctx.state.today(), Weekday::Mon);

    let (status, body) = send(
        patient_routes(ctx.state.clone()),
        get(
            &format!("/doctors/{}/slots?date={}", doctor.profile_id, monday),
            &ctx.bearer(&patient.account),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"].as_array().unwrap().len(), 12);
    assert_eq!(body["slots"][0]["start_time"], "09:00");
}
