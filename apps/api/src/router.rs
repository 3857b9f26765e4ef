use axum::{
    Router,
    routing::get,
};

use admin_cell::router::admin_routes;
use appointment_cell::router::{appointment_routes, doctor_appointment_routes};
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_utils::AppState;

pub fn create_router(state: AppState) -> Router {
    // Profile and availability live in doctor-cell, the appointment desk in appointment-cell.
    let doctor = doctor_routes(state.clone()).merge(doctor_appointment_routes(state.clone()));

    Router::new()
        .route("/", get(|| async { "Hospital administration API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/doctor", doctor)
        .nest("/patient", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use shared_utils::test_utils::TestContext;
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str, bearer: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(bearer) = bearer {
            request = request.header(header::AUTHORIZATION, bearer);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_liveness() {
        let ctx = TestContext::new();
        let (status, _) = get(create_router(ctx.state.clone()), "/", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_prefixes_are_mounted() {
        let ctx = TestContext::new();
        let department = ctx.create_department("Cardiology");
        let doctor = ctx.create_doctor("Dr. Grey", "grey@example.com", department);
        let patient = ctx.create_patient("Pat", "pat@example.com");
        let admin = ctx.create_admin("admin@example.com");

        let (status, _) = get(create_router(ctx.state.clone()), "/admin/dashboard", Some(ctx.bearer(&admin))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            get(create_router(ctx.state.clone()), "/doctor/dashboard", Some(ctx.bearer(&doctor.account))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["doctor"]["id"], doctor.profile_id.to_string());

        let (status, _) =
            get(create_router(ctx.state.clone()), "/doctor/profile", Some(ctx.bearer(&doctor.account))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            get(create_router(ctx.state.clone()), "/patient/dashboard", Some(ctx.bearer(&patient.account))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            get(create_router(ctx.state.clone()), "/admin/dashboard", Some(ctx.bearer(&patient.account))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get(create_router(ctx.state.clone()), "/patient/dashboard", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
