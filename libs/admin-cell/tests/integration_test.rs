use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Weekday;
use serde_json::{json, Value};
use tower::ServiceExt;

use admin_cell::router::admin_routes;
use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{next_weekday, TestContext};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn request(method: Method, uri: &str, bearer: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_admin_creates_department_and_doctor() {
    let ctx = TestContext::new();
    let admin = ctx.bearer(&ctx.create_admin("admin@example.com"));

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(
            Method::POST,
            "/departments",
            &admin,
            Some(json!({"name": "Neurology", "description": "Brain and nerves"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let department_id = body["department"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(
            Method::POST,
            "/doctors",
            &admin,
            Some(json!({
                "name": "Dr. House",
                "email": "house@example.com",
                "password": "vicodin1",
                "department_id": department_id,
                "specialization": "Diagnostics"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["doctor"]["department_name"], "Neurology");

    let (status, body) = send(admin_routes(ctx.state.clone()), request(Method::GET, "/doctors", &admin, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(Method::DELETE, &format!("/departments/{}", department_id), &admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("1 doctor"));
}

#[tokio::test]
async fn test_non_admins_are_forbidden() {
    let ctx = TestContext::new();
    let patient = ctx.create_patient("Pat", "pat@example.com");

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(Method::GET, "/dashboard", &ctx.bearer(&patient.account), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "admin access required");
}

#[tokio::test]
async fn test_blacklisted_doctor_loses_access() {
    let ctx = TestContext::new();
    let admin = ctx.bearer(&ctx.create_admin("admin@example.com"));
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let doctor_bearer = ctx.bearer(&doctor.account);

    let (status, _) = send(doctor_routes(ctx.state.clone()), request(Method::GET, "/profile", &doctor_bearer, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(Method::POST, &format!("/doctors/{}/blacklist", doctor.profile_id), &admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor"]["is_active"], false);

    let (status, _) = send(doctor_routes(ctx.state.clone()), request(Method::GET, "/profile", &doctor_bearer, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        admin_routes(ctx.state.clone()),
        request(Method::POST, &format!("/doctors/{}/activate", doctor.profile_id), &admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(doctor_routes(ctx.state.clone()), request(Method::GET, "/profile", &doctor_bearer, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_books_on_behalf_and_deletes_patient() {
    let ctx = TestContext::new();
    let admin_account = ctx.create_admin("admin@example.com");
    let admin = ctx.bearer(&admin_account);
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
    let patient = ctx.create_patient("Pat", "pat@example.com");
    let monday = next_weekday(ctx.state.today(), Weekday::Mon);

    let (status, _) = send(
        admin_routes(ctx.state.clone()),
        request(
            Method::POST,
            "/appointments",
            &admin,
            Some(json!({"doctor_id": doctor.profile_id, "date": monday, "start_time": "09:00"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(
            Method::POST,
            "/appointments",
            &admin,
            Some(json!({
                "doctor_id": doctor.profile_id,
                "patient_id": patient.profile_id,
                "date": monday,
                "start_time": "09:00"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["patient_id"], patient.profile_id.to_string());

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(Method::GET, &format!("/patients/{}", patient.profile_id), &admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        admin_routes(ctx.state.clone()),
        request(Method::DELETE, &format!("/patients/{}", patient.profile_id), &admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"]["appointments_removed"], 1);
    assert_eq!(ctx.count("appointments"), 0);
    assert_eq!(ctx.count("patient_profiles"), 0);

    let (status, _) = send(
        admin_routes(ctx.state.clone()),
        request(Method::DELETE, &format!("/accounts/{}", admin_account.id), &admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_search_endpoint_filters_by_type() {
    let ctx = TestContext::new();
    let admin = ctx.bearer(&ctx.create_admin("admin@example.com"));
    let department = ctx.create_department("Dermatology");
    ctx.create_doctor("Dr. Skinner", "skinner@example.com", department);
    ctx.create_patient("Pat Skinner", "pat@example.com");

    let (status, body) =
        send(admin_routes(ctx.state.clone()), request(Method::GET, "/search?q=skinner", &admin, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctors"].as_array().unwrap().len(), 1);
    assert_eq!(body["patients"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        admin_routes(ctx.state.clone()),
        request(Method::GET, "/search?q=skinner&type=patients", &admin, None),
    )
    .await;
    assert!(body["doctors"].as_array().unwrap().is_empty());
    assert_eq!(body["patients"].as_array().unwrap().len(), 1);
}
