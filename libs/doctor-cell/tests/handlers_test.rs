use axum::extract::{Extension, State};
use axum::Json;

use doctor_cell::handlers::{get_own_availability, get_own_profile, update_own_profile};
use doctor_cell::models::UpdateOwnProfileRequest;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestContext, TestUser};

#[tokio::test]
async fn test_update_own_profile_changes_only_own_fields() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);

    let request = UpdateOwnProfileRequest {
        name: Some("Dr. Meredith Grey".to_string()),
        specialization: Some("General surgery".to_string()),
        ..UpdateOwnProfileRequest::default()
    };
    let response = update_own_profile(
        State(ctx.state.clone()),
        Extension(doctor.principal()),
        Json(request),
    )
    .await
    .unwrap();

    assert_eq!(response.0["doctor"]["name"], "Dr. Meredith Grey");
    assert_eq!(response.0["doctor"]["specialization"], "General surgery");
    assert_eq!(response.0["doctor"]["experience_years"], 5);
}

#[tokio::test]
async fn test_profile_of_unknown_doctor_is_not_found() {
    let ctx = TestContext::new();
    let ghost = TestUser::doctor("ghost@example.com").principal();

    let result = get_own_profile(State(ctx.state.clone()), Extension(ghost)).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_availability_reports_next_open_date() {
    let ctx = TestContext::new();
    let department = ctx.create_department("Cardiology");
    let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);

    let response = get_own_availability(State(ctx.state.clone()), Extension(doctor.principal()))
        .await
        .unwrap();

    assert_eq!(response.0["doctor_id"], doctor.profile_id.to_string());
    assert!(response.0["next_available_date"].is_string());
}
