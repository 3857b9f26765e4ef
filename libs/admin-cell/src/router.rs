use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_utils::extractor::{auth_middleware, require_admin};
use shared_utils::AppState;

use crate::handlers;

/// Administration routes, mounted under `/admin`.
pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::admin_dashboard))
        .route("/search", get(handlers::search))
        .route("/accounts/{user_id}", delete(handlers::delete_account))
        // Departments
        .route(
            "/departments",
            get(handlers::list_departments).post(handlers::create_department),
        )
        .route(
            "/departments/{department_id}",
            put(handlers::update_department).delete(handlers::delete_department),
        )
        // Doctors
        .route(
            "/doctors",
            get(handlers::list_doctors).post(handlers::create_doctor),
        )
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor)
                .put(handlers::update_doctor)
                .delete(handlers::delete_doctor),
        )
        .route("/doctors/{doctor_id}/blacklist", post(handlers::blacklist_doctor))
        .route("/doctors/{doctor_id}/activate", post(handlers::activate_doctor))
        .route(
            "/doctors/{doctor_id}/availability",
            get(handlers::get_doctor_availability).put(handlers::replace_doctor_availability),
        )
        // Patients
        .route("/patients", get(handlers::list_patients))
        .route(
            "/patients/{patient_id}",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .route("/patients/{patient_id}/blacklist", post(handlers::blacklist_patient))
        .route("/patients/{patient_id}/activate", post(handlers::activate_patient))
        // Appointments
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route(
            "/appointments/{appointment_id}/reschedule",
            post(handlers::reschedule_appointment),
        )
        .route(
            "/appointments/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route(
            "/appointments/{appointment_id}/complete",
            post(handlers::complete_appointment),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
