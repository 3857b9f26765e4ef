use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::TestContext;

fn create_test_app(ctx: &TestContext) -> Router {
    doctor_routes(ctx.state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_doctor_reads_own_profile() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);

    let request = Request::builder()
        .uri("/profile")
        .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(create_test_app(&ctx), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], doctor.profile_id.to_string());
    assert_eq!(body["department_name"], "Cardiology");
    assert_eq!(body["availability"]["monday"][0]["start"], "09:00");
}

#[tokio::test]
async fn test_patient_cannot_use_doctor_routes() {
    let ctx = TestContext::new();
    let patient = ctx.create_patient("Pat", "pat@example.com");

    let request = Request::builder()
        .uri("/availability")
        .header(header::AUTHORIZATION, ctx.bearer(&patient.account))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(create_test_app(&ctx), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "doctor access required");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::new();

    let request = Request::builder().uri("/profile").body(Body::empty()).unwrap();
    let (status, _) = send(create_test_app(&ctx), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_doctor_replaces_availability() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);

    let payload = json!({
        "availability": {
            "saturday": [
                {"start": "10:00", "end": "11:00"},
                {"start": "11:00", "end": "12:30"}
            ]
        }
    });
    let request = Request::builder()
        .method("PUT")
        .uri("/availability")
        .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = send(create_test_app(&ctx), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"]["saturday"], json!([{"start": "10:00", "end": "12:30"}]));
    assert!(body["availability"].get("monday").is_none());
}

#[tokio::test]
async fn test_overlapping_availability_is_rejected() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);

    let payload = json!({
        "availability": {
            "monday": [
                {"start": "09:00", "end": "11:00"},
                {"start": "10:00", "end": "12:00"}
            ]
        }
    });
    let request = Request::builder()
        .method("PUT")
        .uri("/availability")
        .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _) = send(create_test_app(&ctx), request).await;

    assert!(status.is_client_error());

    let request = Request::builder()
        .uri("/availability")
        .header(header::AUTHORIZATION, ctx.bearer(&doctor.account))
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(create_test_app(&ctx), request).await;
    assert_eq!(body["availability"]["monday"][0]["end"], "12:00");
}
