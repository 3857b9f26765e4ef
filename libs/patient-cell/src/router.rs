use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::{auth_middleware, require_patient};
use shared_utils::AppState;

use crate::handlers;

/// Patient self-service routes, mounted under `/patient`.
pub fn patient_routes(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::patient_dashboard))
        .route(
            "/profile",
            get(handlers::get_own_profile).put(handlers::update_own_profile),
        )
        .route("/departments/{department_id}", get(handlers::get_department))
        .route("/doctors", get(handlers::search_doctors))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor))
        .route("/doctors/{doctor_id}/slots", get(handlers::get_doctor_slots))
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/appointments/{appointment_id}/reschedule",
            post(handlers::reschedule_appointment),
        )
        .route(
            "/appointments/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route("/history", get(handlers::treatment_history))
        .layer(middleware::from_fn(require_patient))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
