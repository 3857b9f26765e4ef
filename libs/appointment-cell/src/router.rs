use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::{auth_middleware, require_doctor};
use shared_utils::AppState;

use crate::handlers;

/// Role-neutral appointment routes, mounted under `/appointments`.
/// Ownership is checked per appointment in the services.
pub fn appointment_routes(state: AppState) -> Router {
    Router::new()
        .route("/conflicts/check", get(handlers::check_conflicts))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// The doctor's appointment desk, merged into `/doctor`.
pub fn doctor_appointment_routes(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::doctor_dashboard))
        .route("/appointments", get(handlers::list_doctor_appointments))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/appointments/{appointment_id}/complete",
            post(handlers::complete_appointment),
        )
        .route(
            "/appointments/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route("/patients", get(handlers::list_assigned_patients))
        .route(
            "/patients/{patient_id}/history",
            get(handlers::get_patient_history),
        )
        .layer(middleware::from_fn(require_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
