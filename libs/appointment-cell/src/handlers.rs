use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AppointmentFilter, AppointmentListQuery, CancelAppointmentRequest, ConflictCheckRequest,
    TreatmentInput,
};
use crate::services::{AppointmentBookingService, DoctorRosterService, TreatmentHistoryService};

// ==============================================================================
// SHARED APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(request): Query<ConflictCheckRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Conflict check by {} for doctor {}", principal.id, request.doctor_id);
    let slot_minutes = state.config.default_slot_minutes;

    let check = state
        .db
        .transaction(move |tx| AppointmentBookingService::new(tx, slot_minutes).check_conflicts(request))
        .await?;

    Ok(Json(json!({
        "bookable": check.is_bookable(),
        "check": check
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).get_appointment(&principal, appointment_id)
        })
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// DOCTOR DESK HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();

    let dashboard = state
        .db
        .transaction(move |tx| DoctorRosterService::new(tx).dashboard(&principal, today))
        .await?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = AppointmentFilter::from_query(query, state.today())?;
    let slot_minutes = state.config.default_slot_minutes;

    let appointments = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).list_appointments(&principal, filter)
        })
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
    Json(treatment): Json<TreatmentInput>,
) -> Result<Json<Value>, AppError> {
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).complete_appointment(&principal, appointment_id, treatment)
        })
        .await?;

    Ok(Json(json!({
        "message": "Appointment completed",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).cancel_appointment(&principal, appointment_id, request)
        })
        .await?;

    Ok(Json(json!({
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn list_assigned_patients(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let patients = state
        .db
        .transaction(move |tx| DoctorRosterService::new(tx).assigned_patients(&principal))
        .await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_history(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let history = state
        .db
        .transaction(move |tx| TreatmentHistoryService::new(tx).patient_history(&principal, patient_id))
        .await?;

    Ok(Json(json!(history)))
}
