use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentFilter, AppointmentListQuery, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest,
};
use appointment_cell::services::{AppointmentBookingService, TreatmentHistoryService};
use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{DoctorSearchQuery, PatientView, SlotQuery, UpdateOwnProfileRequest};
use crate::services::{PatientPortalService, PatientService};

// ==============================================================================
// PROFILE & DASHBOARD
// ==============================================================================

#[axum::debug_handler]
pub async fn patient_dashboard(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let dashboard = state
        .db
        .transaction(move |tx| PatientPortalService::new(tx, slot_minutes).dashboard(&principal, today))
        .await?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let patient = state
        .db
        .transaction(move |tx| PatientService::new(tx).own_profile(&principal))
        .await?;

    Ok(Json(json!(PatientView::from(patient))))
}

#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<UpdateOwnProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = state
        .db
        .transaction(move |tx| PatientService::new(tx).update_own_profile(&principal, request))
        .await?;

    Ok(Json(json!({
        "message": "Profile updated",
        "patient": PatientView::from(patient)
    })))
}

// ==============================================================================
// BROWSING DEPARTMENTS & DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_department(
    State(state): State<AppState>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let department = state
        .db
        .transaction(move |tx| PatientPortalService::new(tx, slot_minutes).department(department_id, today))
        .await?;

    Ok(Json(json!(department)))
}

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<AppState>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let doctors = state
        .db
        .transaction(move |tx| PatientPortalService::new(tx, slot_minutes).search_doctors(query, today))
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let doctor = state
        .db
        .transaction(move |tx| PatientPortalService::new(tx, slot_minutes).doctor(doctor_id, today))
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;
    let date = query.date;

    let slots = state
        .db
        .transaction(move |tx| PatientPortalService::new(tx, slot_minutes).doctor_slots(doctor_id, date, today))
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": date,
        "slots": slots
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
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
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).book_appointment(&principal, request, today)
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked",
            "appointment": appointment
        })),
    ))
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

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).reschedule_appointment(
                &principal,
                appointment_id,
                request,
                today,
            )
        })
        .await?;

    Ok(Json(json!({
        "message": "Appointment rescheduled",
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
pub async fn treatment_history(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let history = state
        .db
        .transaction(move |tx| TreatmentHistoryService::new(tx).own_treatments(&principal))
        .await?;

    Ok(Json(json!({
        "history": history,
        "total": history.len()
    })))
}
